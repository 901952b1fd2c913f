//! Flattens a resume into the exact text that gets embedded,
//! hashed and keyword-matched, and pulls naive keywords out of a job description.
//!
//! The flattened text is a cache key input: any change to the layout below
//! invalidates every cached resume embedding.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::resume::ResumeDocument;

const STOPWORDS: &[&str] = &[
    "the", "and", "a", "to", "of", "in", "with", "for", "on", "is", "are", "you", "your", "that",
];

/// Letters, digits and `+ # . -` so that "c++", "c#", "node.js" and "ci-cd"
/// survive as single tokens.
static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{Alphabetic}\p{Nd}+#.\-]+").expect("word pattern is valid"));

/// Renders a resume as plain text with section headers.
///
/// Layout: a `name — title` line, then SUMMARY, EXPERIENCE, PROJECTS,
/// EDUCATION, SKILLS, CERTIFICATIONS, LANGUAGES in that order. Each header is
/// preceded by a blank line and only emitted when the section has content.
pub fn resume_to_plain_text(resume: &ResumeDocument) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(
        format!("{} — {}", resume.name, text(&resume.title))
            .trim()
            .to_string(),
    );

    if let Some(summary) = non_empty(&resume.summary) {
        lines.push(format!("\nSUMMARY\n{summary}"));
    }

    if !resume.experiences.is_empty() {
        lines.push("\nEXPERIENCE".to_string());
        for exp in &resume.experiences {
            lines.push(entry_line(
                &exp.position,
                &exp.company,
                &exp.start_date,
                &exp.end_date,
            ));
            push_body(&mut lines, &exp.description, &exp.bullet_points);
        }
    }

    if !resume.projects.is_empty() {
        lines.push("\nPROJECTS".to_string());
        for project in &resume.projects {
            lines.push(entry_line(
                &project.name,
                &project.role,
                &project.start_date,
                &project.end_date,
            ));
            push_body(&mut lines, &project.description, &project.bullet_points);
        }
    }

    if !resume.education.is_empty() {
        lines.push("\nEDUCATION".to_string());
        for edu in &resume.education {
            lines.push(entry_line(
                &edu.degree,
                &edu.institution,
                &edu.start_date,
                &edu.end_date,
            ));
            push_body(&mut lines, &edu.description, &[]);
        }
    }

    if !resume.skills.is_empty() {
        lines.push("\nSKILLS".to_string());
        lines.push(
            resume
                .skills
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }

    if !resume.certifications.is_empty() {
        let names: Vec<&str> = resume.certifications.iter().map(|c| c.name.as_str()).collect();
        lines.push(format!("\nCERTIFICATIONS\n{}", names.join("; ")));
    }

    if !resume.languages.is_empty() {
        let languages: Vec<String> = resume
            .languages
            .iter()
            .map(|l| format!("{} ({})", l.language, text(&l.proficiency)))
            .collect();
        lines.push(format!("\nLANGUAGES\n{}", languages.join(", ")));
    }

    lines.join("\n")
}

/// `title — organization (start - end)`
fn entry_line(
    title: &Option<String>,
    organization: &Option<String>,
    start: &Option<String>,
    end: &Option<String>,
) -> String {
    format!(
        "{} — {} ({} - {})",
        text(title),
        text(organization),
        text(start),
        text(end)
    )
}

fn push_body(lines: &mut Vec<String>, description: &Option<String>, bullets: &[String]) {
    if let Some(description) = non_empty(description) {
        lines.push(description.to_string());
    }
    for bullet in bullets {
        lines.push(format!("- {bullet}"));
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Returns up to `top_n` keywords from a job description, most frequent first.
///
/// Ties keep first-occurrence order: counts are collected in insertion order and
/// sorted with a stable sort.
pub fn extract_keywords(job_description: &str, top_n: usize) -> Vec<String> {
    let lowered = job_description.to_lowercase();

    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for token in WORD.find_iter(&lowered).map(|m| m.as_str()) {
        if token.chars().count() < 2 || STOPWORDS.contains(&token) {
            continue;
        }
        match index.get(token) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(top_n)
        .map(|(token, _)| token.to_string())
        .collect()
}
