//! Built-in prompt templates, one per question type. Placeholders are
//! `{source_text}`, `{count}` and `{difficulty}`; the templater substitutes
//! them verbatim. The answer-format sections here define the convention the
//! quiz parser expects, so template and parser must evolve together.

pub const MCQ_TEMPLATE: &str = "You are a quiz author. Using ONLY the source material below, write {count} \
multiple-choice questions at {difficulty} difficulty.

Format every question exactly like this, with no commentary before or after:

1. <question text>
A. <option text>
B. <option text>
C. <option text>
D. <option text>
Answer: <letter of the single correct option>

Rules:
- Each question has 2 to 6 options and exactly one correct answer.
- Every option must be distinct and grounded in the source material.
- Do not repeat questions.

Source material:
{source_text}";

pub const TRUE_FALSE_TEMPLATE: &str = "You are a quiz author. Using ONLY the source material below, write {count} \
true/false questions at {difficulty} difficulty.

Format every question exactly like this, with no commentary before or after:

1. <statement to evaluate>
A. True
B. False
Answer: <A or B>

Rules:
- Each statement must be clearly true or clearly false per the source material.
- Do not repeat statements.

Source material:
{source_text}";

pub const IMAGE_TEMPLATE: &str = "You are a quiz author. Using ONLY the source material below, write {count} \
image-based questions at {difficulty} difficulty. Each question refers to an \
image by URL taken from the source material.

Format every question exactly like this, with no commentary before or after:

1. <question text about the image>
Image: <image URL>
A. <option text>
B. <option text>
C. <option text>
D. <option text>
Answer: <letter of the single correct option>

Rules:
- Each question has 2 to 6 options and exactly one correct answer.
- Only reference images that actually appear in the source material.

Source material:
{source_text}";
