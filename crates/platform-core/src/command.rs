//! Command templates: named-placeholder format strings rendered into argv.
//!
//! A template such as `{aerender} -project {jobpath} -comp intro` is filled
//! in with shell-quoted values and only then split into arguments, so every
//! value ends up as exactly one argument no matter which whitespace or shell
//! metacharacters it contains. The result is executed directly, never
//! through a shell.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use bumper_common::error::{BumperError, BumperResult};

/// A command format string with `{name}` placeholders.
///
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    template: String,
}

/// A template together with the values for its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    template: CommandTemplate,
    values: BTreeMap<String, String>,
}

/// A fully rendered command: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Start binding values to this template.
    pub fn bind(&self, name: &str, value: impl Into<String>) -> CommandSpec {
        CommandSpec {
            template: self.clone(),
            values: BTreeMap::new(),
        }
        .bind(name, value)
    }

    /// Substitute quoted values, then split into an argument vector.
    pub fn render(&self, values: &BTreeMap<String, String>) -> BumperResult<CommandLine> {
        let substituted = substitute(&self.template, values)?;
        let mut argv = shlex::split(&substituted).ok_or_else(|| {
            BumperError::template(format!(
                "command template '{}' has unbalanced quoting",
                self.template
            ))
        })?;
        if argv.is_empty() {
            return Err(BumperError::template("command template is empty"));
        }
        let program = argv.remove(0);
        Ok(CommandLine {
            program,
            args: argv,
        })
    }
}

impl CommandSpec {
    pub fn bind(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn bind_path(self, name: &str, path: &Path) -> Self {
        let value = path.to_string_lossy().into_owned();
        self.bind(name, value)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn render(&self) -> BumperResult<CommandLine> {
        self.template.render(&self.values)
    }
}

impl CommandLine {
    /// Program file name without directories, for log and error messages.
    pub fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted = std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shlex::try_quote(part).map(|q| q.into_owned()).unwrap_or_else(|_| part.clone()))
            .collect::<Vec<_>>();
        f.write_str(&quoted.join(" "))
    }
}

fn substitute(template: &str, values: &BTreeMap<String, String>) -> BumperResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(BumperError::template(format!(
                                "unterminated placeholder in '{template}'"
                            )))
                        }
                    }
                }
                let value = values.get(&name).ok_or_else(|| {
                    BumperError::template(format!("no value for placeholder '{{{name}}}'"))
                })?;
                let quoted = shlex::try_quote(value).map_err(|e| {
                    BumperError::template(format!("cannot quote value for '{{{name}}}': {e}"))
                })?;
                out.push_str(&quoted);
            }
            '}' => {
                return Err(BumperError::template(format!(
                    "single '}}' in command template '{template}'"
                )))
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
