//! Prompt templates sent to the model.
//!
//! Every structured result is imposed here and recovered by post-parsing, so
//! the JSON schema in [`chunk_prompt`] must stay in sync with
//! [`ChunkSet`](super::types::ChunkSet).

use super::types::{Chunk, SlideRecord};

/// Marker used when a slide belongs to no chunk
pub const NO_CHUNK_CONTEXT: &str = "No chunk context available for this slide.";

pub const SUMMARY_PROMPT: &str = "Please summarize each page of this document.";

const CHUNK_SCHEMA: &str = r#"{
  "academic_context": "brief overall academic context of the lecture",
  "chunks": [
    {
      "topic": "topic name",
      "pedagogical_goal": "what a student should understand after these slides",
      "slides": ["slide content 1", "slide content 2"],
      "slide_numbers": [1, 2],
      "is_logistics": false
    }
  ]
}"#;

/// Instructions for grouping the attached deck into topic chunks
pub fn chunk_prompt(overall_summary: Option<&str>) -> String {
    let mut prompt = format!(
        r#"Group the slides of the attached lecture into topic chunks and answer with JSON only, using exactly this structure:
{schema}

Rules:
1. Every slide number of the document appears in exactly one chunk, in ascending order.
2. "slides" and "slide_numbers" have the same length and correspond index by index.
3. Slide numbers are 1-based integers matching the page numbers of the PDF.
4. Mark chunks made only of course logistics (title pages, grading, schedules) with "is_logistics": true.
5. Output valid JSON with no commentary and no markdown code fences.
"#,
        schema = CHUNK_SCHEMA
    );

    if let Some(summary) = overall_summary.filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\nHere is a page-by-page summary of the document to help you:\n");
        prompt.push_str(summary);
        prompt.push('\n');
    }
    prompt
}

fn render_chunk(chunk: &Chunk) -> String {
    let mut out = format!(
        "Topic: {}\nPedagogical goal: {}\nLogistics: {}\nSlides in this topic: {}\n",
        chunk.topic,
        chunk.pedagogical_goal,
        if chunk.is_logistics { "yes" } else { "no" },
        chunk
            .slide_numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for (i, slide) in chunk.slides.iter().enumerate() {
        match chunk.slide_numbers.get(i) {
            Some(n) => out.push_str(&format!("- Slide {}: {}\n", n, slide.prompt_text())),
            None => out.push_str(&format!("- {}\n", slide.prompt_text())),
        }
    }
    out
}

/// Context-aware explanation request for one slide
pub fn slide_prompt(
    slide_number: u32,
    academic_context: &str,
    overall_summary: &str,
    chunk: Option<&Chunk>,
) -> String {
    let chunk_context = chunk.map(render_chunk).unwrap_or_else(|| NO_CHUNK_CONTEXT.to_string());
    format!(
        r##"You are a teaching assistant explaining slide {n} of a lecture to a student.

Formatting rules:
- Start with a single markdown header line ("# ...") giving a short title for slide {n}.
- Use markdown headers and bullet points to structure the explanation.
- Do not use fenced code blocks; use inline code only for short terms.
- Explain the concepts in depth, with intuition and small examples where useful.

Academic context: {context}

Overall summary of the lecture:
{summary}

Topic this slide belongs to:
{chunk}

Now explain slide {n}."##,
        n = slide_number,
        context = academic_context,
        summary = overall_summary,
        chunk = chunk_context,
    )
}

/// Free-form question about a slide, answered with the attached deck
pub fn question_prompt(
    question: &str,
    current_slide: u32,
    neighbors: &[(u32, SlideRecord)],
    lecture_context: &str,
) -> String {
    let slides_context = neighbors
        .iter()
        .map(|(n, record)| format!("Slide {}: {}\n{}", n, record.title, record.summary))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"This is a question about slide {n} of the PDF document.

Question: {question}

Current Slide: {n}

Surrounding Slides Content:
{slides}

Overall Lecture Context: {context}

Please focus on the content of slide {n} when answering the question. You may also reference nearby slides if they provide relevant context.
Only answer based on what you can see in the actual PDF document."#,
        n = current_slide,
        question = question,
        slides = slides_context,
        context = lecture_context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::SlideContent;

    #[test]
    fn chunk_prompt_embeds_schema_and_optional_summary() {
        let without = chunk_prompt(None);
        assert!(without.contains("\"pedagogical_goal\""));
        assert!(without.contains("\"is_logistics\""));
        assert!(!without.contains("page-by-page summary"));

        let with = chunk_prompt(Some("Page 1: intro"));
        assert!(with.contains("Page 1: intro"));
    }

    #[test]
    fn slide_prompt_renders_chunk_or_marker() {
        let chunk = Chunk {
            topic: "Buffer pool".to_string(),
            pedagogical_goal: "Eviction".to_string(),
            slides: vec![SlideContent::Text("LRU".to_string())],
            slide_numbers: vec![7],
            is_logistics: false,
        };
        let prompt = slide_prompt(7, "DB", "summary", Some(&chunk));
        assert!(prompt.contains("Topic: Buffer pool"));
        assert!(prompt.contains("- Slide 7: LRU"));
        assert!(!prompt.contains(NO_CHUNK_CONTEXT));

        let bare = slide_prompt(8, "DB", "summary", None);
        assert!(bare.contains(NO_CHUNK_CONTEXT));
        assert!(bare.contains("explain slide 8"));
    }

    #[test]
    fn slide_prompt_keeps_header_instruction_intact() {
        let prompt = slide_prompt(3, "Database systems", "Page 3: heap files", None);
        assert!(prompt.contains(r##"("# ...")"##));
        assert!(prompt.contains("Academic context: Database systems"));
        assert!(prompt.contains("Page 3: heap files"));
        assert!(prompt.trim_end().ends_with("Now explain slide 3."));
    }
}
