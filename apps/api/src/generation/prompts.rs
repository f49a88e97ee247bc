// All LLM prompt constants for CV and cover-letter generation.
// Slots are `{name}` and are filled once by `composer::fill_slots`; any other
// brace group (LaTeX arguments in particular) passes through untouched.

/// System prompt for CV generation.
pub const CV_SYSTEM: &str = "You are an expert CV/resume writer and LaTeX specialist. \
    You produce complete, compilable LaTeX documents tailored to a specific job. \
    You never invent employers, degrees, dates or certifications that are not in the original CV.";

/// CV prompt. Slots: {resume_text}, {job_description}, {company_name}, {language},
/// {mode_instructions}, {template_instruction}, {raw_output_instruction}
pub const CV_PROMPT_TEMPLATE: &str = r"Given the following information:

ORIGINAL CV:
{resume_text}

JOB DESCRIPTION:
{job_description}

COMPANY NAME:
{company_name}

OUTPUT LANGUAGE:
{language}

{mode_instructions}

Your task:
1. Analyze the job description and identify key requirements, skills, and qualifications
2. Tailor the original CV according to the enhancement mode specified above
3. Generate a complete, professional LaTeX document for the CV in the specified OUTPUT LANGUAGE ({language})
4. Use a modern, clean CV layout (like moderncv or a custom professional design)
5. Emphasize achievements and experiences most relevant to the job
6. Ensure the LaTeX code is complete and compilable{template_instruction}

CRITICAL: To avoid font errors, ALWAYS include these two lines in the preamble:
\usepackage[T1]{fontenc}
\usepackage{lmodern}

{raw_output_instruction}
Start directly with \documentclass and end with \end{document}.";

/// Appended to the CV prompt when a template is in use. Slots: {template}, {placeholder_instruction}
pub const TEMPLATE_INSTRUCTION_TEMPLATE: &str = r"

Use this LaTeX template structure. Keep its preamble, commands and section layout:
{template}{placeholder_instruction}";

/// Appended after the template when it carries `<<NAME>>` markers. Slot: {placeholders}
pub const PLACEHOLDER_INSTRUCTION_TEMPLATE: &str = r"

The template marks the content to write with placeholder markers: {placeholders}.
Replace every marker with content from the original CV; repeat a block for each additional entry of the same kind.
Do NOT invent sections or structure the template does not have, and do NOT leave any marker in the output.";

/// System prompt for cover-letter generation.
pub const COVER_LETTER_SYSTEM: &str = "You are an expert cover letter writer. \
    You write concise, specific letters grounded in the candidate's actual experience.";

/// Cover letter prompt. Slots: {resume_text}, {job_description}, {company_name}, {language},
/// {raw_output_instruction}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r"Given the following information:

ORIGINAL CV:
{resume_text}

JOB DESCRIPTION:
{job_description}

COMPANY NAME:
{company_name}

OUTPUT LANGUAGE:
{language}

Your task:
1. Write a compelling, professional cover letter for this job application in the specified OUTPUT LANGUAGE ({language})
2. Highlight the most relevant qualifications and experiences from the CV
3. Show enthusiasm for the role and company
4. Demonstrate understanding of the company's needs based on the job description
5. Keep it concise (3-4 paragraphs)
6. Use a professional but engaging tone
7. Include appropriate placeholders for [Your Name], [Your Address], [Date], etc.

{raw_output_instruction}
Output the cover letter text in a standard business letter format.";

pub const CONSERVATIVE_MODE_INSTRUCTIONS: &str = "\
ENHANCEMENT MODE: CONSERVATIVE (Styling Only)
- Keep ALL content from the original CV exactly as written
- ONLY improve the LaTeX formatting, layout, and visual styling
- Do NOT add, remove, or modify any text content
- Do NOT add new skills, experiences, or achievements
- Use better typography, spacing, and visual hierarchy";

pub const BALANCED_MODE_INSTRUCTIONS: &str = "\
ENHANCEMENT MODE: BALANCED (Add Relevant Details)
- Enhance the CV by adding relevant keywords from the job description
- Expand on existing experiences to highlight relevant skills
- Add context and details that are implied but not explicitly stated
- Emphasize transferable skills and relevant achievements
- Improve clarity and impact of existing bullet points
- Do NOT fabricate experiences or skills not present in the original";

pub const AGGRESSIVE_MODE_INSTRUCTIONS: &str = "\
ENHANCEMENT MODE: AGGRESSIVE (Maximum Impact)
- Optimize every aspect of the CV for maximum impact
- Use powerful action verbs and compelling language
- Quantify achievements wherever possible (add realistic metrics only if implied)
- Highlight transferable skills that match the job requirements
- Add relevant keywords from the job description naturally
- Present experiences in the most impressive way while staying truthful";
