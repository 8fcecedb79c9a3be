//! Fluent construction of logs.

use crate::logging::error::BuildError;
use crate::logging::log::Log;
use crate::logging::rule::Rule;

/// Builder for [`Log`]s.
///
/// # Example
///
/// ```rust
/// use reflex::logging::{Log, Rule};
///
/// let log = Log::builder()
///     .name("pose")
///     .rule(Rule::Update)
///     .loggee("heading", "pose.heading")
///     .loggee_fields("ned", "pose.ned", &["north", "east"])
///     .build()
///     .unwrap();
///
/// assert_eq!(log.name(), "pose");
/// ```
pub struct LogBuilder {
    name: Option<String>,
    rule: Option<Rule>,
    loggees: Vec<(String, String, Option<Vec<String>>)>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            rule: None,
            loggees: Vec::new(),
        }
    }

    /// Set the log name (required).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the firing rule (required).
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Project a share under `tag` with columns from its own field order.
    pub fn loggee(mut self, tag: &str, share: &str) -> Self {
        self.loggees.push((tag.to_string(), share.to_string(), None));
        self
    }

    /// Project a share under `tag`, narrowed to the given fields.
    pub fn loggee_fields(mut self, tag: &str, share: &str, fields: &[&str]) -> Self {
        self.loggees.push((
            tag.to_string(),
            share.to_string(),
            Some(fields.iter().map(|f| f.to_string()).collect()),
        ));
        self
    }

    /// Build the log.
    pub fn build(self) -> Result<Log, BuildError> {
        let name = self.name.ok_or(BuildError::MissingName)?;
        let rule = self.rule.ok_or(BuildError::MissingRule)?;

        let mut log = Log::new(name, rule);
        for (tag, share, fields) in self.loggees {
            match fields {
                Some(fields) => {
                    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
                    log.add_loggee_fields(&tag, &share, &fields);
                }
                None => log.add_loggee(&tag, &share),
            }
        }
        Ok(log)
    }
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_validates_missing_name() {
        let result = LogBuilder::new().rule(Rule::Always).build();
        assert!(matches!(result, Err(BuildError::MissingName)));
    }

    #[test]
    fn builder_validates_missing_rule() {
        let result = LogBuilder::new().name("test").build();
        assert!(matches!(result, Err(BuildError::MissingRule)));
    }

    #[test]
    fn builder_keeps_loggee_order() {
        let log = LogBuilder::new()
            .name("test")
            .rule(Rule::Always)
            .loggee("b", "share.b")
            .loggee("a", "share.a")
            .build()
            .unwrap();

        let tags: Vec<&str> = log.loggees().iter().map(|l| l.tag()).collect();
        assert_eq!(tags, ["b", "a"]);
    }
}
