// ABOUTME: Static checks over a parsed handlebars template before it executes
// ABOUTME: Rejects unknown helpers, reads from the empty data context, partials and decorators

use handlebars::template::{
    BlockParam, HelperTemplate, Parameter, Subexpression, Template, TemplateElement,
};
use handlebars::Path;
use std::collections::{BTreeSet, HashMap};

use super::error::{Result, TemplateError};

/// Block helpers whose body is rendered against the block's own value
const CONTEXT_HELPERS: [&str; 2] = ["each", "with"];

/// Walk every element of `template`.
///
/// The data context is always empty, so any field read that resolves
/// against the root can never succeed and is reported before rendering.
pub fn check_template(template: &Template, helpers: &BTreeSet<String>) -> Result<()> {
    let mut checker = Checker {
        helpers,
        depth: 0,
        block_params: Vec::new(),
    };
    checker.template(template, 1)
}

struct Checker<'a> {
    helpers: &'a BTreeSet<String>,
    // number of enclosing each/with bodies
    depth: usize,
    block_params: Vec<String>,
}

impl Checker<'_> {
    fn template(&mut self, template: &Template, enclosing_line: usize) -> Result<()> {
        for (index, element) in template.elements.iter().enumerate() {
            let line = template
                .mapping
                .get(index)
                .map_or(enclosing_line, |mapping| mapping.0);
            self.element(element, line)?;
        }
        Ok(())
    }

    fn element(&mut self, element: &TemplateElement, line: usize) -> Result<()> {
        match element {
            TemplateElement::RawString(_) | TemplateElement::Comment(_) => Ok(()),
            TemplateElement::Expression(ht) | TemplateElement::HtmlExpression(ht) => {
                self.expression(ht, line)
            }
            TemplateElement::HelperBlock(ht) => self.block(ht, line),
            TemplateElement::PartialExpression(dt) | TemplateElement::PartialBlock(dt) => {
                Err(TemplateError::Unsupported {
                    construct: format!("partial {}", label(&dt.name)),
                    line,
                })
            }
            TemplateElement::DecoratorExpression(dt) | TemplateElement::DecoratorBlock(dt) => {
                Err(TemplateError::Unsupported {
                    construct: format!("decorator {}", label(&dt.name)),
                    line,
                })
            }
        }
    }

    fn expression(&mut self, ht: &HelperTemplate, line: usize) -> Result<()> {
        if let Parameter::Subexpression(sub) = &ht.name {
            return self.subexpression(sub, line);
        }

        let has_arguments = !ht.params.is_empty() || !ht.hash.is_empty();
        match &ht.name {
            // `{{name}}` is a helper call when such a helper exists, a field read otherwise
            Parameter::Path(path) if !has_arguments && !self.is_helper(&ht.name) => {
                self.data_reference(path, line)
            }
            name => {
                self.require_helper(name, line)?;
                self.arguments(&ht.params, &ht.hash, line)
            }
        }
    }

    fn block(&mut self, ht: &HelperTemplate, line: usize) -> Result<()> {
        self.require_helper(&ht.name, line)?;
        self.arguments(&ht.params, &ht.hash, line)?;

        if let Some(body) = &ht.template {
            let enters_context = ht
                .name
                .as_name()
                .map_or(false, |name| CONTEXT_HELPERS.contains(&name));
            let bound = self.block_params.len();
            self.block_params.extend(block_param_names(ht.block_param.as_ref()));
            if enters_context {
                self.depth += 1;
            }

            let result = self.template(body, line);

            if enters_context {
                self.depth -= 1;
            }
            self.block_params.truncate(bound);
            result?;
        }

        // `{{else}}` renders in the enclosing context
        if let Some(inverse) = &ht.inverse {
            self.template(inverse, line)?;
        }
        Ok(())
    }

    fn subexpression(&mut self, sub: &Subexpression, line: usize) -> Result<()> {
        match sub.as_element() {
            // a subexpression always calls a helper, even without arguments
            TemplateElement::Expression(ht) => {
                self.require_helper(&ht.name, line)?;
                self.arguments(&ht.params, &ht.hash, line)
            }
            other => self.element(other, line),
        }
    }

    fn arguments(
        &mut self,
        params: &[Parameter],
        hash: &HashMap<String, Parameter>,
        line: usize,
    ) -> Result<()> {
        for param in params.iter().chain(hash.values()) {
            match param {
                Parameter::Path(path) => self.data_reference(path, line)?,
                Parameter::Subexpression(sub) => self.subexpression(sub, line)?,
                Parameter::Literal(_) | Parameter::Name(_) => {}
            }
        }
        Ok(())
    }

    fn is_helper(&self, name: &Parameter) -> bool {
        name.as_name()
            .map_or(false, |name| self.helpers.contains(name))
    }

    fn require_helper(&self, name: &Parameter, line: usize) -> Result<()> {
        if self.is_helper(name) {
            Ok(())
        } else {
            Err(TemplateError::UndefinedHelper {
                name: label(name),
                line,
            })
        }
    }

    fn data_reference(&self, path: &Path, line: usize) -> Result<()> {
        let raw = match path {
            // @index, @key, @first and friends
            Path::Local(_) => return Ok(()),
            Path::Relative((_, raw)) => raw,
        };

        if self.reads_root(raw) {
            Err(TemplateError::MissingDataKey(format!(
                "{:?} (line {})",
                raw, line
            )))
        } else {
            Ok(())
        }
    }

    /// Whether a relative path resolves to a field of the root context
    fn reads_root(&self, raw: &str) -> bool {
        let mut rest = raw;
        let mut levels_up = 0;
        while let Some(stripped) = rest.strip_prefix("../") {
            levels_up += 1;
            rest = stripped;
        }

        let field = if let Some(stripped) = rest.strip_prefix("@root") {
            stripped
        } else if rest.starts_with('@') {
            return false;
        } else if self.depth > levels_up {
            // inside each/with the block value decides, checked while rendering
            return false;
        } else {
            rest
        };

        let field = strip_current(field);
        match field.split(is_separator).next() {
            None | Some("") => false,
            Some(first) => !self.block_params.iter().any(|name| name == first),
        }
    }
}

fn is_separator(c: char) -> bool {
    c == '.' || c == '/'
}

/// Drop a leading `this`, `./` or separator so only the field path remains
fn strip_current(field: &str) -> &str {
    let field = field.trim_start_matches(is_separator);
    match field.strip_prefix("this") {
        Some(rest) if rest.is_empty() || rest.starts_with(is_separator) => {
            rest.trim_start_matches(is_separator)
        }
        _ => field,
    }
}

fn block_param_names(param: Option<&BlockParam>) -> Vec<String> {
    let names: Vec<&Parameter> = match param {
        None => Vec::new(),
        Some(BlockParam::Single(name)) => vec![name],
        Some(BlockParam::Pair((first, second))) => vec![first, second],
    };
    names
        .into_iter()
        .filter_map(|name| name.as_name().map(str::to_string))
        .collect()
}

fn label(name: &Parameter) -> String {
    name.as_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", name))
}
