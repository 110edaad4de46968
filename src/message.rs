//! Runtime message templates.
//!
//! Templates use `{}` placeholders filled positionally, `{{` and `}}`
//! for literal braces. A template rendered without arguments is taken
//! verbatim, so pre-formatted text may contain braces freely. Rendering
//! never fails: a template that does not fit its arguments is returned
//! verbatim with an error marker appended.

use std::fmt::{self, Display, Write};

#[derive(Debug, PartialEq, Eq)]
enum TemplateError {
    MissingArgument(usize),
    UnusedArguments(usize),
    UnmatchedBrace(usize),
    DisplayFailed(usize),
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument(n) => write!(f, "no argument for placeholder {}", n),
            Self::UnusedArguments(n) => write!(f, "{} unused argument(s)", n),
            Self::UnmatchedBrace(pos) => write!(f, "unmatched brace at byte {}", pos),
            Self::DisplayFailed(n) => write!(f, "argument {} failed to display", n),
        }
    }
}

/// Fill `template` with `args`, falling back to the raw template on error.
pub fn render(template: &str, args: &[&dyn Display]) -> String {
    if args.is_empty() {
        return template.to_string();
    }
    match try_render(template, args) {
        Ok(msg) => msg,
        Err(e) => format!("{} [format error: {}]", template, e),
    }
}

fn try_render(template: &str, args: &[&dyn Display]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut next = 0;
    let mut chars = template.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => match chars.next() {
                Some((_, '{')) => out.push('{'),
                Some((_, '}')) => {
                    let arg = args.get(next).ok_or(TemplateError::MissingArgument(next))?;
                    // Writing into a String only fails if the Display impl does.
                    write!(out, "{}", arg).map_err(|_| TemplateError::DisplayFailed(next))?;
                    next += 1;
                }
                _ => return Err(TemplateError::UnmatchedBrace(pos)),
            },
            '}' => match chars.next() {
                Some((_, '}')) => out.push('}'),
                _ => return Err(TemplateError::UnmatchedBrace(pos)),
            },
            c => out.push(c),
        }
    }

    if next < args.len() {
        return Err(TemplateError::UnusedArguments(args.len() - next));
    }
    Ok(out)
}
