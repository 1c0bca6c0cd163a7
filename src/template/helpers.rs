// ABOUTME: Handlebars helpers exposed to rendered templates
// ABOUTME: Implements join, quote, env and the Consul-backed cv, qcv, cvl and qcvl lookups

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError,
    ScopedJson,
};
use serde_json::Value as JsonValue;
use std::env;

use super::error::HelperError;
use crate::kv::KvResolver;

/// Helpers that need no store access
pub const PURE_HELPERS: [&str; 3] = ["join", "quote", "env"];

/// Helpers bound to a resolver
pub const STORE_HELPERS: [&str; 4] = ["cv", "qcv", "cvl", "qcvl"];

/// Wrap a string in literal double quotes.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s)
}

/// Value of an environment variable; empty counts as unset.
pub fn env_value(name: &str) -> Result<String, HelperError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        Ok(_) | Err(env::VarError::NotPresent) => Err(HelperError::EnvVarUnset {
            name: name.to_string(),
        }),
        Err(env::VarError::NotUnicode(_)) => Err(HelperError::EnvVarNotUnicode {
            name: name.to_string(),
        }),
    }
}

fn string_param<'a>(
    h: &'a Helper,
    index: usize,
    expected: &str,
) -> Result<&'a str, HelperError> {
    h.param(index)
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| HelperError::invalid_argument(h.name(), expected))
}

fn derived<'reg, 'rc>(value: JsonValue) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
    Ok(ScopedJson::Derived(value))
}

/// `join SEP LIST` - joins string elements with a separator
pub struct JoinHelper;

impl HelperDef for JoinHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let separator = string_param(h, 0, "a separator string")?;

        let items = h
            .param(1)
            .and_then(|v| v.value().as_array())
            .ok_or_else(|| HelperError::invalid_argument("join", "a list of strings"))?;

        let strings = items
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| HelperError::invalid_argument("join", "list elements to be strings"))
            })
            .collect::<Result<Vec<&str>, HelperError>>()?;

        derived(JsonValue::String(strings.join(separator)))
    }
}

/// `quote S` - wraps a string in double quotes
pub struct QuoteHelper;

impl HelperDef for QuoteHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let input = string_param(h, 0, "a string")?;
        derived(JsonValue::String(quote(input)))
    }
}

/// `env NAME` - environment variable lookup, failing when unset or empty
pub struct EnvHelper;

impl HelperDef for EnvHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let name = string_param(h, 0, "a variable name")?;
        derived(JsonValue::String(env_value(name)?))
    }
}

/// `cv KEY` / `qcv KEY` - single value read through the resolver
pub struct ValueHelper {
    resolver: KvResolver,
    quoted: bool,
}

impl ValueHelper {
    pub fn new(resolver: KvResolver, quoted: bool) -> Self {
        Self { resolver, quoted }
    }

    fn lookup(&self, h: &Helper) -> Result<String, HelperError> {
        let key = string_param(h, 0, "a key")?;
        let value = self.resolver.get_value(key)?;
        Ok(if self.quoted { quote(&value) } else { value })
    }
}

impl HelperDef for ValueHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        derived(JsonValue::String(self.lookup(h)?))
    }
}

/// `cvl PREFIX` / `qcvl PREFIX` - every value under a prefix, in key order
pub struct ListHelper {
    resolver: KvResolver,
    quoted: bool,
}

impl ListHelper {
    pub fn new(resolver: KvResolver, quoted: bool) -> Self {
        Self { resolver, quoted }
    }

    fn lookup(&self, h: &Helper) -> Result<Vec<String>, HelperError> {
        let key = string_param(h, 0, "a key prefix")?;
        let values = self.resolver.list_values(key)?;
        Ok(if self.quoted {
            values.iter().map(|v| quote(v)).collect()
        } else {
            values
        })
    }
}

impl HelperDef for ListHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let values = self.lookup(h)?;
        derived(JsonValue::Array(
            values.into_iter().map(JsonValue::String).collect(),
        ))
    }

    // Written directly, a list prints as `[a b]`.
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let values = self.lookup(h)?;
        out.write(&format!("[{}]", values.join(" ")))?;
        Ok(())
    }
}

/// Register the helpers that need no store access
pub fn register_helpers(handlebars: &mut Handlebars) {
    handlebars.register_helper("join", Box::new(JoinHelper));
    handlebars.register_helper("quote", Box::new(QuoteHelper));
    handlebars.register_helper("env", Box::new(EnvHelper));
}

/// Register the Consul-backed helpers, each holding its own resolver handle
pub fn register_store_helpers(handlebars: &mut Handlebars, resolver: &KvResolver) {
    handlebars.register_helper("cv", Box::new(ValueHelper::new(resolver.clone(), false)));
    handlebars.register_helper("qcv", Box::new(ValueHelper::new(resolver.clone(), true)));
    handlebars.register_helper("cvl", Box::new(ListHelper::new(resolver.clone(), false)));
    handlebars.register_helper("qcvl", Box::new(ListHelper::new(resolver.clone(), true)));
}
