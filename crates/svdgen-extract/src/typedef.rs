//! Locates the body of one `typedef struct` block.

/// Lines of a located structure body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeBlock<'a> {
    pub type_name: String,
    /// 1-based line number of the first body line.
    pub first_line: usize,
    pub lines: Vec<&'a str>,
}

/// Scanner state.
#[derive(Debug)]
enum ScanState<'a> {
    Searching,
    Collecting {
        start_line: usize,
        lines: Vec<&'a str>,
    },
}

fn is_opening(line: &str) -> bool {
    matches!(
        line.trim(),
        "typedef struct" | "typedef struct {" | "typedef struct{"
    )
}

/// Name declared by a `} NAME;` closing line.
fn closing_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('}')?.trim();
    let name = rest.strip_suffix(';')?.trim_end();
    (!name.is_empty()).then_some(name)
}

/// Find the body of the structure closed by `} type_name;`.
///
/// Blocks closing with another name are discarded. Nested aggregates are
/// fine as long as their closing braces are indented.
pub fn locate_type<'a>(text: &'a str, type_name: &str) -> Option<TypeBlock<'a>> {
    let mut state = ScanState::Searching;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if is_opening(line) {
            if let ScanState::Collecting { start_line, .. } = &state {
                tracing::debug!(start_line, line = line_no, "unterminated structure, restarting");
            }
            state = ScanState::Collecting {
                start_line: line_no + 1,
                lines: Vec::new(),
            };
            continue;
        }

        state = match state {
            ScanState::Searching => ScanState::Searching,
            ScanState::Collecting { start_line, lines } if line.starts_with('}') => {
                if closing_name(line) == Some(type_name) {
                    tracing::debug!(type_name, start_line, lines = lines.len(), "type located");
                    return Some(TypeBlock {
                        type_name: type_name.to_owned(),
                        first_line: start_line,
                        lines,
                    });
                }
                ScanState::Searching
            }
            ScanState::Collecting {
                start_line,
                mut lines,
            } => {
                lines.push(line);
                ScanState::Collecting { start_line, lines }
            }
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BLOCKS: &str = "\
typedef struct
{
  __IO uint32_t DATA;      /*!< Data register,   Address offset : 0x00 */
} FOO_TypeDef;

typedef struct
{
  __IO uint32_t CTRL;      /*!< Control register, Address offset : 0x00 */
  __I  uint32_t STAT;      /*!< Status register,  Address offset : 0x04 */
} BAR_TypeDef;
";

    #[test]
    fn returns_lines_between_markers() {
        let block = locate_type(TWO_BLOCKS, "BAR_TypeDef").unwrap();
        assert_eq!(block.first_line, 7);
        assert_eq!(block.lines.len(), 3);
        assert_eq!(block.lines[0], "{");
        assert!(block.lines[2].contains("STAT"));
    }

    #[test]
    fn non_matching_block_discarded() {
        let block = locate_type(TWO_BLOCKS, "FOO_TypeDef").unwrap();
        assert_eq!(block.lines.len(), 2);
        assert!(!block.lines.iter().any(|l| l.contains("CTRL")));
    }

    #[test]
    fn brace_on_opening_line_and_spacing() {
        let text = "typedef struct {\n  __IO uint32_t A;\n}   BAZ_TypeDef ;\n";
        let block = locate_type(text, "BAZ_TypeDef").unwrap();
        assert_eq!(block.lines, vec!["  __IO uint32_t A;"]);
    }

    #[test]
    fn indented_nested_closing_kept() {
        let text = "\
typedef struct
{
  union {
    __IO uint32_t A;
  };
} U_TypeDef;
";
        let block = locate_type(text, "U_TypeDef").unwrap();
        assert_eq!(block.lines.len(), 5);
    }

    #[test]
    fn missing_type_not_found() {
        assert_eq!(locate_type(TWO_BLOCKS, "QUX_TypeDef"), None);
    }
}
