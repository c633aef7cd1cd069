//! `{field}` scanning over a sequence of text runs.
//!
//! Word processors split visible text into many runs (spell-check marks,
//! formatting changes, revision ids), so a placeholder typed as `{petitioner}`
//! often arrives as `{`, `petit`, `ioner}` across three `<w:t>` elements, and
//! can even cross a paragraph boundary. Scanning therefore runs over the
//! concatenation of every run in the part: the replacement value is written
//! into the run holding the opening brace and the consumed characters are
//! removed from the runs that follow.

use super::TemplateError;

const OPEN: char = '{';
const CLOSE: char = '}';

/// Outcome of scanning one part.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Substitution {
    /// New text per run; equal to the input for untouched runs.
    pub texts: Vec<String>,
    /// Whether each run was rewritten.
    pub modified: Vec<bool>,
    /// Number of placeholders replaced.
    pub replaced: usize,
}

impl Substitution {
    pub fn is_unchanged(&self) -> bool {
        self.replaced == 0
    }
}

enum ScanState {
    Outside,
    Inside { start_run: usize, name: String },
}

/// Replace every `{name}` in `runs` using `resolve`.
///
/// Names are trimmed before lookup. `resolve` returning `None` means the name
/// is not a supported field, which fails the whole part.
pub(crate) fn substitute<'v, F>(
    part: &str,
    runs: &[String],
    resolve: F,
) -> Result<Substitution, TemplateError>
where
    F: Fn(&str) -> Option<&'v str>,
{
    let mut texts: Vec<String> = vec![String::new(); runs.len()];
    let mut modified = vec![false; runs.len()];
    let mut replaced = 0usize;
    let mut state = ScanState::Outside;

    for (idx, run) in runs.iter().enumerate() {
        for ch in run.chars() {
            match &mut state {
                ScanState::Outside => match ch {
                    OPEN => {
                        modified[idx] = true;
                        state = ScanState::Inside {
                            start_run: idx,
                            name: String::new(),
                        };
                    }
                    CLOSE => {
                        return Err(TemplateError::UnopenedTag {
                            part: part.to_string(),
                            context: texts[idx].clone(),
                        })
                    }
                    _ => texts[idx].push(ch),
                },
                ScanState::Inside { start_run, name } => {
                    modified[idx] = true;
                    match ch {
                        CLOSE => {
                            let key = name.trim();
                            let value = resolve(key).ok_or_else(|| {
                                TemplateError::UnknownPlaceholder {
                                    part: part.to_string(),
                                    name: key.to_string(),
                                }
                            })?;
                            texts[*start_run].push_str(value);
                            replaced += 1;
                            state = ScanState::Outside;
                        }
                        OPEN => {
                            return Err(TemplateError::UnclosedTag {
                                part: part.to_string(),
                                name: name.trim().to_string(),
                            })
                        }
                        _ => name.push(ch),
                    }
                }
            }
        }
    }

    if let ScanState::Inside { name, .. } = state {
        return Err(TemplateError::UnclosedTag {
            part: part.to_string(),
            name: name.trim().to_string(),
        });
    }

    Ok(Substitution {
        texts,
        modified,
        replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn lookup(name: &str) -> Option<&'static str> {
        match name {
            "petitioner" => Some("Jane Doe"),
            "csp" => Some(""),
            _ => None,
        }
    }

    #[test]
    fn test_single_run_placeholder() {
        let out = substitute("p", &runs(&["Petitioner: {petitioner}."]), lookup).unwrap();
        assert_eq!(out.texts, vec!["Petitioner: Jane Doe."]);
        assert_eq!(out.modified, vec![true]);
        assert_eq!(out.replaced, 1);
    }

    #[test]
    fn test_placeholder_split_across_runs() {
        let out = substitute("p", &runs(&["A {peti", "tion", "er} B", "C"]), lookup).unwrap();
        assert_eq!(out.texts, vec!["A Jane Doe", "", " B", "C"]);
        assert_eq!(out.modified, vec![true, true, true, false]);
    }

    #[test]
    fn test_repeated_placeholders_all_replaced() {
        let out = substitute("p", &runs(&["{petitioner}/{ petitioner }"]), lookup).unwrap();
        assert_eq!(out.texts, vec!["Jane Doe/Jane Doe"]);
        assert_eq!(out.replaced, 2);
    }

    #[test]
    fn test_empty_value_still_substitutes() {
        let out = substitute("p", &runs(&["CSP:{csp}!"]), lookup).unwrap();
        assert_eq!(out.texts, vec!["CSP:!"]);
    }

    #[test]
    fn test_no_placeholders_is_unchanged() {
        let out = substitute("p", &runs(&["plain", "text"]), lookup).unwrap();
        assert!(out.is_unchanged());
        assert_eq!(out.modified, vec![false, false]);
        assert_eq!(out.texts, runs(&["plain", "text"]));
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let err = substitute("word/document.xml", &runs(&["{judge}"]), lookup).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnknownPlaceholder { ref name, .. } if name == "judge"
        ));
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        assert!(matches!(
            substitute("p", &runs(&["{petitioner"]), lookup),
            Err(TemplateError::UnclosedTag { .. })
        ));
        assert!(matches!(
            substitute("p", &runs(&["{a{b}"]), lookup),
            Err(TemplateError::UnclosedTag { .. })
        ));
        assert!(matches!(
            substitute("p", &runs(&["oops}"]), lookup),
            Err(TemplateError::UnopenedTag { .. })
        ));
    }
}
