//! Instruction templates sent to the completion endpoint.
//!
//! Each template is a single user message; placeholders in braces are
//! substituted verbatim, with no escaping of the user's text.

use crate::schemas::FormData;

/// Fixed instruction template with a stable identifier for logging
#[derive(Debug, Clone, Copy)]
pub struct Prompt {
    /// Stable identifier (format: category-name-v1)
    pub id: &'static str,
    pub one_liner: &'static str,
    pub template: &'static str,
}

pub const FIELD_SCHEMA_PROMPT: Prompt = Prompt {
    id: "wizard-field-schema-v1",
    one_liner: "Infer the form fields a formal document needs",
    template: "\
Based on the description of a formal document below, respond with valid JSON only: an array of objects. \
Each object must have the properties \"name\" and \"type\" (for example \"text\", \"number\", \"date\", \"email\"), \
describing the data needed to generate the document. Do not include anything other than the JSON array.
Document description:
{document_prompt}
",
};

pub const DOCUMENT_PROMPT: Prompt = Prompt {
    id: "wizard-document-html-v1",
    one_liner: "Render the finished document as HTML",
    template: "\
Based on the following description of a formal document:
\"{document_prompt}\"
and the following data in JSON format:
{form_data}
Generate a complete formal document in HTML that reproduces the expected layout and formatting \
and is ready to be rendered directly in a browser. The response must contain only clean HTML code.
",
};

/// Instruction asking for the field list of `document_prompt`.
pub fn field_schema_instruction(document_prompt: &str) -> String {
    FIELD_SCHEMA_PROMPT
        .template
        .replace("{document_prompt}", document_prompt)
}

/// Instruction asking for the finished document, embedding the form values.
pub fn document_instruction(document_prompt: &str, form_data: &FormData) -> String {
    // form data first so a literal "{document_prompt}" typed into a value is left alone
    DOCUMENT_PROMPT
        .template
        .replace("{form_data}", &form_data.to_pretty_json())
        .replacen("{document_prompt}", document_prompt, 1)
}
