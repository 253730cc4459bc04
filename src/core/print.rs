// src/core/print.rs
//! Printable rendering of a CV: one self-contained HTML document per template,
//! styles inlined, which asks the browser for its print dialog once loaded.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::core::validation::check_field;
use crate::core::editor::PersonalField;
use crate::types::cv_data::{CvData, EducationItem, ExperienceItem, TemplateId};
use crate::utils::print_file_path;

/// A rendered document ready to be handed to a print target
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub title: String,
    pub template: TemplateId,
    pub html: String,
}

impl PrintJob {
    pub fn new(cv: &CvData, template: TemplateId) -> Self {
        Self {
            title: cv.full_name(),
            template,
            html: render_html(cv, template),
        }
    }
}

/// Fire-and-forget print target
pub trait PrintRenderer: Send + Sync {
    /// Returns where the document landed, when that is a file
    fn print(&self, job: &PrintJob) -> Result<Option<PathBuf>>;
}

/// Writes the HTML into the output directory and, when asked, opens it in the
/// default browser, where the page raises the print dialog itself
pub struct HtmlFileRenderer {
    output_dir: PathBuf,
    open_browser: bool,
}

impl HtmlFileRenderer {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            open_browser: false,
        }
    }

    pub fn open_in_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }
}

impl PrintRenderer for HtmlFileRenderer {
    fn print(&self, job: &PrintJob) -> Result<Option<PathBuf>> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create directory: {}", self.output_dir.display())
        })?;

        let path = print_file_path(&self.output_dir, &job.title, job.template.as_str(), Utc::now());
        fs::write(&path, &job.html)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        info!("Printable CV written to {}", path.display());

        if self.open_browser {
            if let Err(e) = webbrowser::open(&path.to_string_lossy()) {
                warn!("Failed to open {} in a browser: {}", path.display(), e);
            }
        }

        Ok(Some(path))
    }
}

// ===== Themes =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    SingleColumn,
    Sidebar,
}

struct Theme {
    font: &'static str,
    accent: &'static str,
    text: &'static str,
    muted: &'static str,
    header_bg: &'static str,
    header_text: &'static str,
    sidebar_bg: &'static str,
    sidebar_text: &'static str,
    layout: Layout,
}

fn theme(template: TemplateId) -> Theme {
    match template {
        TemplateId::Elegance => Theme {
            font: "Georgia, 'Times New Roman', serif",
            accent: "#1f3a5f",
            text: "#222222",
            muted: "#6b7280",
            header_bg: "#ffffff",
            header_text: "#1f3a5f",
            sidebar_bg: "#ffffff",
            sidebar_text: "#222222",
            layout: Layout::SingleColumn,
        },
        TemplateId::Bold => Theme {
            font: "'Helvetica Neue', Arial, sans-serif",
            accent: "#e63946",
            text: "#111111",
            muted: "#555555",
            header_bg: "#111111",
            header_text: "#ffffff",
            sidebar_bg: "#ffffff",
            sidebar_text: "#111111",
            layout: Layout::SingleColumn,
        },
        TemplateId::Minimal => Theme {
            font: "'Inter', 'Segoe UI', sans-serif",
            accent: "#111111",
            text: "#333333",
            muted: "#8a8a8a",
            header_bg: "#ffffff",
            header_text: "#111111",
            sidebar_bg: "#ffffff",
            sidebar_text: "#333333",
            layout: Layout::SingleColumn,
        },
        TemplateId::Creative => Theme {
            font: "'Poppins', 'Trebuchet MS', sans-serif",
            accent: "#7c3aed",
            text: "#1f2937",
            muted: "#6b7280",
            header_bg: "#ffffff",
            header_text: "#7c3aed",
            sidebar_bg: "#7c3aed",
            sidebar_text: "#ffffff",
            layout: Layout::Sidebar,
        },
        TemplateId::Executive => Theme {
            font: "'Garamond', Georgia, serif",
            accent: "#b8860b",
            text: "#1c1c1c",
            muted: "#5f5f5f",
            header_bg: "#ffffff",
            header_text: "#1c1c1c",
            sidebar_bg: "#1c2833",
            sidebar_text: "#f4f4f4",
            layout: Layout::Sidebar,
        },
    }
}

fn stylesheet(t: &Theme) -> String {
    format!(
        r#"@page {{ size: A4; margin: 0; }}
* {{ box-sizing: border-box; }}
body {{ margin: 0; font-family: {font}; color: {text}; font-size: 11pt; line-height: 1.45; -webkit-print-color-adjust: exact; print-color-adjust: exact; }}
.page {{ width: 210mm; min-height: 297mm; margin: 0 auto; display: flex; }}
.main {{ flex: 1; padding: 14mm 16mm; }}
aside {{ width: 68mm; padding: 14mm 8mm; background: {sidebar_bg}; color: {sidebar_text}; }}
aside h2 {{ color: {sidebar_text}; border-color: {sidebar_text}; }}
header {{ background: {header_bg}; color: {header_text}; padding: 0 0 6mm 0; display: flex; align-items: center; gap: 6mm; }}
.tpl-bold header {{ margin: -14mm -16mm 6mm -16mm; padding: 10mm 16mm; }}
header h1 {{ margin: 0; font-size: 26pt; letter-spacing: 0.5px; }}
header .title {{ margin: 2px 0 0 0; font-size: 13pt; color: {accent}; }}
.photo {{ width: 32mm; height: 32mm; border-radius: 50%; object-fit: cover; }}
aside .photo {{ display: block; margin: 0 auto 6mm auto; border: 3px solid {sidebar_text}; }}
.contact {{ list-style: none; padding: 0; margin: 4px 0 0 0; font-size: 9.5pt; color: {muted}; }}
aside .contact {{ color: {sidebar_text}; }}
.contact li {{ margin: 2px 0; word-break: break-word; }}
section {{ margin-top: 6mm; }}
h2 {{ font-size: 12pt; text-transform: uppercase; letter-spacing: 1px; color: {accent}; border-bottom: 1.5px solid {accent}; padding-bottom: 2px; margin: 0 0 3mm 0; }}
.tpl-minimal h2 {{ border-bottom: none; font-weight: 600; }}
.entry {{ margin-bottom: 4mm; page-break-inside: avoid; }}
.entry .heading {{ display: flex; justify-content: space-between; gap: 4mm; }}
.entry .what {{ font-weight: bold; }}
.entry .where {{ color: {muted}; }}
.entry .when {{ color: {muted}; font-size: 9.5pt; white-space: nowrap; }}
.entry p {{ margin: 1mm 0 0 0; }}
.skills, .languages {{ list-style: none; padding: 0; margin: 0; }}
.skills li, .languages li {{ display: flex; justify-content: space-between; margin: 1.5mm 0; }}
.dots {{ letter-spacing: 2px; color: {accent}; }}
aside .dots {{ color: {sidebar_text}; }}
.level {{ color: {muted}; font-size: 9.5pt; }}
aside .level {{ color: {sidebar_text}; }}
"#,
        font = t.font,
        text = t.text,
        accent = t.accent,
        muted = t.muted,
        header_bg = t.header_bg,
        header_text = t.header_text,
        sidebar_bg = t.sidebar_bg,
        sidebar_text = t.sidebar_text,
    )
}

// ===== Rendering =====

/// Full standalone HTML document for `cv` in `template`
pub fn render_html(cv: &CvData, template: TemplateId) -> String {
    let theme = theme(template);
    let name = cv.full_name();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>CV - {}</title>", escape(&name));
    let _ = writeln!(html, "<style>\n{}</style>\n</head>", stylesheet(&theme));
    let _ = writeln!(html, "<body class=\"tpl-{}\">\n<div class=\"page\">", template.as_str());

    match theme.layout {
        Layout::SingleColumn => {
            html.push_str("<div class=\"main\">\n");
            render_header(&mut html, cv, true);
            render_summary(&mut html, cv);
            render_experiences(&mut html, &cv.experiences);
            render_educations(&mut html, &cv.educations);
            render_skills(&mut html, cv);
            render_languages(&mut html, cv);
            html.push_str("</div>\n");
        }
        Layout::Sidebar => {
            html.push_str("<aside>\n");
            render_photo(&mut html, cv);
            render_contact(&mut html, cv);
            render_skills(&mut html, cv);
            render_languages(&mut html, cv);
            html.push_str("</aside>\n<div class=\"main\">\n");
            render_header(&mut html, cv, false);
            render_summary(&mut html, cv);
            render_experiences(&mut html, &cv.experiences);
            render_educations(&mut html, &cv.educations);
            html.push_str("</div>\n");
        }
    }

    html.push_str("</div>\n<script>window.addEventListener('load', function () { window.print(); });</script>\n</body>\n</html>\n");
    html
}

fn render_header(html: &mut String, cv: &CvData, with_contact: bool) {
    html.push_str("<header>\n");
    if with_contact {
        render_photo(html, cv);
    }
    html.push_str("<div>\n");
    let _ = writeln!(html, "<h1>{}</h1>", escape(&cv.full_name()));
    let title = cv.personal_info.title.trim();
    if !title.is_empty() {
        let _ = writeln!(html, "<p class=\"title\">{}</p>", escape(title));
    }
    if with_contact {
        render_contact(html, cv);
    }
    html.push_str("</div>\n</header>\n");
}

fn render_photo(html: &mut String, cv: &CvData) {
    let Some(photo) = cv.personal_info.photo.as_deref() else {
        return;
    };
    // only embedded images, never remote URLs
    if check_field(PersonalField::Photo, photo).is_none() {
        let _ = writeln!(html, "<img class=\"photo\" src=\"{}\" alt=\"\">", escape(photo));
    }
}

fn render_contact(html: &mut String, cv: &CvData) {
    let info = &cv.personal_info;
    let items: Vec<&str> = [info.email.trim(), info.phone.trim(), info.address.trim()]
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect();
    if items.is_empty() {
        return;
    }

    html.push_str("<ul class=\"contact\">\n");
    for item in items {
        let _ = writeln!(html, "<li>{}</li>", escape(item));
    }
    html.push_str("</ul>\n");
}

fn render_summary(html: &mut String, cv: &CvData) {
    let summary = cv.personal_info.summary.trim();
    if summary.is_empty() {
        return;
    }
    let _ = writeln!(
        html,
        "<section>\n<h2>Profil</h2>\n<p>{}</p>\n</section>",
        multiline(summary)
    );
}

fn render_experiences(html: &mut String, items: &[ExperienceItem]) {
    if items.is_empty() {
        return;
    }
    html.push_str("<section>\n<h2>Expérience professionnelle</h2>\n");
    for exp in items {
        render_entry(
            html,
            &exp.position,
            &exp.company,
            &date_range(&exp.start_date, exp.display_end_date()),
            &exp.description,
        );
    }
    html.push_str("</section>\n");
}

fn render_educations(html: &mut String, items: &[EducationItem]) {
    if items.is_empty() {
        return;
    }
    html.push_str("<section>\n<h2>Formation</h2>\n");
    for edu in items {
        let what = match (edu.degree.trim(), edu.field.trim()) {
            (degree, "") => degree.to_string(),
            ("", field) => field.to_string(),
            (degree, field) => format!("{} - {}", degree, field),
        };
        render_entry(
            html,
            &what,
            &edu.school,
            &date_range(&edu.start_date, Some(edu.end_date.as_str())),
            &edu.description,
        );
    }
    html.push_str("</section>\n");
}

fn render_entry(html: &mut String, what: &str, where_: &str, when: &str, description: &str) {
    html.push_str("<div class=\"entry\">\n<div class=\"heading\">\n<div>");
    let _ = write!(html, "<span class=\"what\">{}</span>", escape(what.trim()));
    if !where_.trim().is_empty() {
        let _ = write!(html, " <span class=\"where\">· {}</span>", escape(where_.trim()));
    }
    html.push_str("</div>\n");
    if !when.is_empty() {
        let _ = writeln!(html, "<span class=\"when\">{}</span>", escape(when));
    }
    html.push_str("</div>\n");
    if !description.trim().is_empty() {
        let _ = writeln!(html, "<p>{}</p>", multiline(description.trim()));
    }
    html.push_str("</div>\n");
}

fn render_skills(html: &mut String, cv: &CvData) {
    let skills: Vec<_> = cv.skills.iter().filter(|s| !s.name.trim().is_empty()).collect();
    if skills.is_empty() {
        return;
    }
    html.push_str("<section>\n<h2>Compétences</h2>\n<ul class=\"skills\">\n");
    for skill in skills {
        let filled = usize::from(skill.level.min(5));
        let dots = format!("{}{}", "●".repeat(filled), "○".repeat(5 - filled));
        let _ = writeln!(
            html,
            "<li><span>{}</span><span class=\"dots\">{}</span></li>",
            escape(skill.name.trim()),
            dots
        );
    }
    html.push_str("</ul>\n</section>\n");
}

fn render_languages(html: &mut String, cv: &CvData) {
    let languages: Vec<_> = cv
        .languages
        .iter()
        .filter(|l| !l.name.trim().is_empty())
        .collect();
    if languages.is_empty() {
        return;
    }
    html.push_str("<section>\n<h2>Langues</h2>\n<ul class=\"languages\">\n");
    for language in languages {
        let _ = writeln!(
            html,
            "<li><span>{}</span><span class=\"level\">{}</span></li>",
            escape(language.name.trim()),
            escape(language.level.label())
        );
    }
    html.push_str("</ul>\n</section>\n");
}

/// `start – end`, `start – Présent` for a current position, or whichever side is set
fn date_range(start: &str, end: Option<&str>) -> String {
    let start = start.trim();
    match end.map(str::trim) {
        None if start.is_empty() => "Présent".to_string(),
        None => format!("{} – Présent", start),
        Some("") => start.to_string(),
        Some(end) if start.is_empty() => end.to_string(),
        Some(end) => format!("{} – {}", start, end),
    }
}

fn multiline(text: &str) -> String {
    escape(text).replace('\n', "<br>")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
