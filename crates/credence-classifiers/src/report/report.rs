//! Minimal single-file HTML report: a header and a list of titled sections,
//! each holding maud markup and inline plotly figures.
use std::fs;
use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

#[derive(Debug, Clone)]
pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.content.push(content);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        self.content.push(PreEscaped(plot.to_inline_html(None)));
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    div class="block" { (block) }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    software: String,
    version: String,
    title: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(software: &str, version: &str, title: &str) -> Self {
        Report {
            software: software.to_string(),
            version: version.to_string(),
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style {
                        "body { font-family: sans-serif; margin: 2em auto; max-width: 960px; }
                        table { border-collapse: collapse; }
                        td, th { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
                        .block { margin-bottom: 1.5em; }"
                    }
                }
                body {
                    header {
                        h1 { (self.title) }
                        p { (self.software) " v" (self.version) }
                    }
                    @for section in &self.sections {
                        (section.render())
                    }
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        fs::write(path, self.render().into_string())
    }
}
