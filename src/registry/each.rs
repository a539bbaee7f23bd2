//! Parameterized declarations and name templates
//!
//! Rows are serialized to JSON so a template can refer to them positionally
//! (`%s`, `%d`, `%p`, ...) or by field (`$name`, `$0`, `$user.id`).

use serde::Serialize;
use serde_json::Value;

use super::builder::{SuiteBuilder, TestOptions};
use super::tree::{SuiteId, TestId};
use crate::task::Task;

/// Pending parameterized declaration returned by [`SuiteBuilder::each`]
pub struct Each<'b, 'a, T> {
    builder: &'b mut SuiteBuilder<'a>,
    rows: Vec<T>,
}

impl<'b, 'a, T: Serialize> Each<'b, 'a, T> {
    pub(crate) fn new(builder: &'b mut SuiteBuilder<'a>, rows: Vec<T>) -> Self {
        Self { builder, rows }
    }

    /// Declare one test per row
    pub fn test<F>(self, template: &str, body: F) -> Vec<TestId>
    where
        F: Fn(&T) -> Task,
    {
        self.test_with(template, TestOptions::new(), body)
    }

    pub fn test_with<F>(self, template: &str, options: impl Into<TestOptions>, body: F) -> Vec<TestId>
    where
        F: Fn(&T) -> Task,
    {
        let options = options.into();
        let Each { builder, rows } = self;
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let name = format_name(template, &to_value(row), index);
                builder.test_with(name, options, body(row))
            })
            .collect()
    }

    /// Declare one suite per row
    pub fn describe<F>(self, template: &str, body: F) -> Vec<SuiteId>
    where
        F: Fn(&mut SuiteBuilder<'_>, &T),
    {
        let Each { builder, rows } = self;
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let name = format_name(template, &to_value(row), index);
                builder.describe(name, |s| body(s, row))
            })
            .collect()
    }
}

fn to_value<T: Serialize>(row: &T) -> Value {
    serde_json::to_value(row).unwrap_or(Value::Null)
}

/// Expand a name template for one row
///
/// `%` placeholders consume the row's elements in order (a non-array row is a
/// single argument). `$field` looks a value up by key, dotted path or array
/// index. `%#` and `$#` expand to the row index. Placeholders without a value
/// are left as written.
pub fn format_name(template: &str, row: &Value, index: usize) -> String {
    let args: Vec<&Value> = match row {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let mut next_arg = 0;
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '%' => {
                let Some(&conv) = chars.peek() else {
                    out.push('%');
                    continue;
                };
                match conv {
                    '%' => {
                        chars.next();
                        out.push('%');
                    }
                    '#' => {
                        chars.next();
                        out.push_str(&index.to_string());
                    }
                    's' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O' | 'p' => {
                        chars.next();
                        match args.get(next_arg) {
                            Some(value) => {
                                next_arg += 1;
                                out.push_str(&render_placeholder(conv, value));
                            }
                            None => {
                                out.push('%');
                                out.push(conv);
                            }
                        }
                    }
                    _ => out.push('%'),
                }
            }
            '$' => {
                if chars.peek() == Some(&'#') {
                    chars.next();
                    out.push_str(&index.to_string());
                    continue;
                }
                let mut key = String::new();
                while let Some(&k) = chars.peek() {
                    if k.is_ascii_alphanumeric() || k == '_' || k == '.' {
                        key.push(k);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // A trailing dot is punctuation, not part of the path.
                let trailing_dots = key.len() - key.trim_end_matches('.').len();
                key.truncate(key.len() - trailing_dots);

                match lookup(row, &key) {
                    Some(value) if !key.is_empty() => out.push_str(&display(value)),
                    _ => {
                        out.push('$');
                        out.push_str(&key);
                    }
                }
                out.extend(std::iter::repeat('.').take(trailing_dots));
            }
            _ => out.push(c),
        }
    }

    out
}

fn render_placeholder(conv: char, value: &Value) -> String {
    match conv {
        's' => display(value),
        'd' => match value.as_f64() {
            Some(n) if n.fract() == 0.0 => format!("{}", n as i64),
            Some(n) => n.to_string(),
            None => "NaN".to_string(),
        },
        'i' => match value.as_f64() {
            Some(n) => format!("{}", n.trunc() as i64),
            None => "NaN".to_string(),
        },
        'f' => match value.as_f64() {
            Some(n) => n.to_string(),
            None => "NaN".to_string(),
        },
        'p' => pretty(value),
        _ => value.to_string(),
    }
}

/// Strings without quotes, everything else as compact JSON
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strings quoted, everything else as compact JSON
fn pretty(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

fn lookup<'v>(row: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(row, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use serde_json::json;

    #[test]
    fn test_positional_placeholders() {
        let row = json!([1, 2, 3]);
        assert_eq!(format_name("add(%d, %d) = %d", &row, 0), "add(1, 2) = 3");
        assert_eq!(format_name("%s and %s", &json!(["a", "b"]), 0), "a and b");
        assert_eq!(format_name("%p", &json!(["a"]), 0), "\"a\"");
        assert_eq!(format_name("%i", &json!([2.9]), 0), "2");
        assert_eq!(format_name("%f", &json!([1.5]), 0), "1.5");
        assert_eq!(format_name("%j", &json!([{"a": 1}]), 0), "{\"a\":1}");
    }

    #[test]
    fn test_scalar_row_is_single_argument() {
        assert_eq!(format_name("value %s", &json!("x"), 0), "value x");
        assert_eq!(format_name("n=%d", &json!(7), 0), "n=7");
    }

    #[test]
    fn test_index_and_literal_percent() {
        assert_eq!(format_name("case %# is 100%%", &json!([]), 4), "case 4 is 100%");
        assert_eq!(format_name("row $#", &json!({}), 2), "row 2");
    }

    #[test]
    fn test_missing_arguments_stay_verbatim() {
        assert_eq!(format_name("%s %s", &json!(["only"]), 0), "only %s");
        assert_eq!(format_name("50% off", &json!([]), 0), "50% off");
        assert_eq!(format_name("$missing", &json!({"a": 1}), 0), "$missing");
    }

    #[test]
    fn test_named_interpolation() {
        let row = json!({"a": 1, "b": 2, "user": {"name": "ada"}});
        assert_eq!(format_name("$a + $b.", &row, 0), "1 + 2.");
        assert_eq!(format_name("hi $user.name", &row, 0), "hi ada");
        assert_eq!(format_name("first $0", &json!(["x", "y"]), 0), "first x");
    }

    #[test]
    fn test_each_declares_one_test_per_row() {
        #[derive(Serialize)]
        struct Case {
            a: i32,
            b: i32,
        }

        let mut registry = Registry::new();
        registry.declare(|s| {
            s.describe("sum", |s| {
                s.each(vec![Case { a: 1, b: 2 }, Case { a: 3, b: 4 }])
                    .test("$a + $b", |case| {
                        let (a, b) = (case.a, case.b);
                        Task::sync(move || {
                            assert!(a + b > 0);
                            Ok(())
                        })
                    });
            });
            s.each([[1, 1], [2, 4]]).describe("square %d", |s, row| {
                let expected = row[1];
                s.test(format!("is {expected}"), Task::noop());
            });
        });

        let tree = registry.finish();
        let names: Vec<String> = tree.test_ids().map(|t| tree.full_name(t)).collect();
        assert_eq!(
            names,
            vec!["sum 1 + 2", "sum 3 + 4", "square 1 is 1", "square 2 is 4"]
        );
    }
}
