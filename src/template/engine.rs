// ABOUTME: Main template engine implementation using Handlebars in strict mode
// ABOUTME: Compiles a template against the registered helpers and streams the rendered output

use handlebars::{Handlebars, Template};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::io::Write;
use tracing::debug;

use super::error::{Result, TemplateError};
use super::check;
use super::helpers;
use crate::kv::KvResolver;

const TEMPLATE_NAME: &str = "template";

/// Helpers that ship with handlebars itself
const BUILTIN_HELPERS: [&str; 17] = [
    "if", "unless", "each", "with", "lookup", "raw", "log", "eq", "ne", "gt", "gte", "lt", "lte",
    "and", "or", "not", "len",
];

pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    helper_names: BTreeSet<String>,
}

impl TemplateEngine {
    /// Create a strict-mode engine with the pure helpers registered
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        // Unknown data keys are errors, not empty strings
        handlebars.set_strict_mode(true);
        handlebars.set_dev_mode(false);

        // Rendering config files, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        helpers::register_helpers(&mut handlebars);

        let helper_names = BUILTIN_HELPERS
            .iter()
            .chain(helpers::PURE_HELPERS.iter())
            .map(|name| name.to_string())
            .collect();

        Self {
            handlebars,
            helper_names,
        }
    }

    /// Register cv, qcv, cvl and qcvl bound to `resolver`
    pub fn with_resolver(mut self, resolver: &KvResolver) -> Self {
        helpers::register_store_helpers(&mut self.handlebars, resolver);
        self.helper_names
            .extend(helpers::STORE_HELPERS.iter().map(|name| name.to_string()));
        debug!("Store helpers bound to prefix {:?}", resolver.prefix());
        self
    }

    /// Parse `source` and reject anything that cannot render against an empty context
    fn check(&self, source: &str) -> Result<Template> {
        let template =
            Template::compile(source).map_err(|e| TemplateError::Syntax(e.to_string()))?;
        check::check_template(&template, &self.helper_names)?;
        Ok(template)
    }

    /// Compile `source` into a template ready to execute
    pub fn compile(mut self, source: &str) -> Result<CompiledTemplate> {
        let template = self.check(source)?;
        self.handlebars.register_template(TEMPLATE_NAME, template);
        debug!("Compiled template ({} bytes)", source.len());

        Ok(CompiledTemplate {
            handlebars: self.handlebars,
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed template bound to its helpers
pub struct CompiledTemplate {
    handlebars: Handlebars<'static>,
}

impl CompiledTemplate {
    /// Execute against the empty data context, writing output as it is produced.
    ///
    /// On error, whatever was produced before the failing expression has
    /// already reached `writer`.
    pub fn render_to<W: Write>(&self, writer: W) -> Result<()> {
        self.handlebars
            .render_to_write(TEMPLATE_NAME, &empty_context(), writer)
            .map_err(TemplateError::from)
    }

    /// Execute into memory
    pub fn render(&self) -> Result<String> {
        self.handlebars
            .render(TEMPLATE_NAME, &empty_context())
            .map_err(TemplateError::from)
    }
}

fn empty_context() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvError, MemoryStore};
    use crate::template::HelperError;
    use std::sync::Arc;

    fn store_engine() -> TemplateEngine {
        let store = MemoryStore::new()
            .with("app/a", "1")
            .with("app/list/x", "1")
            .with("app/list/y", "2");
        TemplateEngine::new().with_resolver(&KvResolver::new(Arc::new(store), "app/"))
    }

    fn render(source: &str) -> Result<String> {
        store_engine().compile(source)?.render()
    }

    #[test]
    fn test_literal_text_is_identity() {
        let text = "listen 8080;\nserver_name example.com; # {not a tag}\n";
        assert_eq!(render(text).unwrap(), text);
        assert_eq!(render("").unwrap(), "");
    }

    #[test]
    fn test_no_html_escaping() {
        let store = MemoryStore::new().with("html", "<a href=\"x\">&</a>");
        let engine =
            TemplateEngine::new().with_resolver(&KvResolver::new(Arc::new(store), ""));
        let result = engine.compile("{{cv \"html\"}}").unwrap().render().unwrap();
        assert_eq!(result, "<a href=\"x\">&</a>");
    }

    #[test]
    fn test_store_helpers() {
        assert_eq!(render("a={{cv \"a\"}} q={{qcv \"a\"}}").unwrap(), "a=1 q=\"1\"");
        assert_eq!(render("{{join \",\" (qcvl \"list/\")}}").unwrap(), "\"1\",\"2\"");
    }

    #[test]
    fn test_template_syntax_error() {
        let result = store_engine().compile("Hello {{name}");
        assert!(matches!(result, Err(TemplateError::Syntax(_))));

        let result = store_engine().compile("{{#if x}}mismatched{{/each}}");
        assert!(matches!(result, Err(TemplateError::Syntax(_))));
    }

    #[test]
    fn test_undefined_helper_rejected_at_compile_time() {
        let result = store_engine().compile("ok\n{{consul_value \"a\"}}");
        match result {
            Err(TemplateError::UndefinedHelper { name, line }) => {
                assert_eq!(name, "consul_value");
                assert_eq!(line, 2);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown helper compiled"),
        }
    }

    #[test]
    fn test_store_helpers_unknown_without_resolver() {
        let result = TemplateEngine::new().compile("{{cv \"a\"}}");
        assert!(matches!(
            result,
            Err(TemplateError::UndefinedHelper { .. })
        ));
    }

    #[test]
    fn test_missing_data_key() {
        let result = render("Hello {{name}}!");
        assert!(matches!(result, Err(TemplateError::MissingDataKey(_))));
    }

    #[test]
    fn test_helper_failure_stops_output() {
        let compiled = store_engine()
            .compile("before {{cv \"a\"}} {{cv \"missing\"}} after")
            .unwrap();
        let mut out = Vec::new();

        let err = compiled.render_to(&mut out).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Helper(HelperError::Store(KvError::NotFound { .. }))
        ));
        assert_eq!(String::from_utf8(out).unwrap(), "before 1 ");
    }

    #[test]
    fn test_block_helper_rejected_before_output() {
        match store_engine().compile("pre {{#nope}}x{{/nope}}") {
            Err(TemplateError::UndefinedHelper { name, line }) => {
                assert_eq!(name, "nope");
                assert_eq!(line, 1);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown block helper compiled"),
        }

        let result = store_engine().compile("pre {{cv \"a\"}} \\\\{{nope \"a\"}}");
        assert!(matches!(
            result,
            Err(TemplateError::UndefinedHelper { .. })
        ));
    }

    #[test]
    fn test_conditions_on_undeclared_fields_fail_to_compile() {
        for source in [
            "pre {{#if x}}y{{/if}}",
            "pre {{#unless x}}y{{/unless}}",
            "pre {{quote x}}",
            "pre {{eq x 1}}",
        ] {
            assert!(
                matches!(
                    store_engine().compile(source),
                    Err(TemplateError::MissingDataKey(_))
                ),
                "{source:?} should fail to compile"
            );
        }
    }

    #[test]
    fn test_partial_rejected() {
        assert!(matches!(
            store_engine().compile("pre {{> part}}"),
            Err(TemplateError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_conditionals_on_store_values() {
        let result = render("{{#if (eq (cv \"a\") \"1\")}}one{{else}}other{{/if}}").unwrap();
        assert_eq!(result, "one");
    }
}
