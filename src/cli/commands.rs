// ABOUTME: The render command behind the ctmpl CLI
// ABOUTME: Reads the template, builds the Consul-backed engine and writes the result to stdout

use anyhow::{Context, Result};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::args::Args;
use super::config::Config;
use super::error::CliError;
use crate::kv::{ConsulClient, KvResolver, KvStore};
use crate::template::{CompiledTemplate, TemplateEngine};

/// Render the template named on the command line to stdout
pub fn render_template(args: &Args, config: &Config) -> Result<()> {
    let template_path = args.template_path()?;
    let source = read_template(template_path)?;
    let buffered = args.buffered || config.output.buffered;

    info!("Rendering template: {}", template_path.display());

    process_template(&source, &args.prefix, config, buffered, io::stdout().lock())
        .with_context(|| format!("Error processing template {}", template_path.display()))
}

/// Read the whole template file into memory
pub fn read_template(path: &Path) -> std::result::Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::ReadTemplate {
        path: path.to_path_buf(),
        source,
    })
}

/// Build a Consul client from `config` and render `source` into `out`
pub fn process_template<W: Write>(
    source: &str,
    prefix: &str,
    config: &Config,
    buffered: bool,
    out: W,
) -> Result<()> {
    let client = ConsulClient::new(&config.consul)?;
    render_with_store(source, Arc::new(client), prefix, buffered, out)
}

/// Render `source` with KV helpers backed by `store`
pub fn render_with_store<W: Write>(
    source: &str,
    store: Arc<dyn KvStore>,
    prefix: &str,
    buffered: bool,
    out: W,
) -> Result<()> {
    let resolver = KvResolver::new(store, prefix);
    let compiled = TemplateEngine::new().with_resolver(&resolver).compile(source)?;
    write_output(&compiled, buffered, out)
}

/// Stream the template into `out`, or hold everything back until it succeeded.
///
/// When streaming, output produced before a failure is still flushed.
pub fn write_output<W: Write>(compiled: &CompiledTemplate, buffered: bool, out: W) -> Result<()> {
    if buffered {
        let rendered = compiled.render()?;
        let mut out = out;
        out.write_all(rendered.as_bytes())?;
        out.flush()?;
        debug!("Wrote {} bytes", rendered.len());
        return Ok(());
    }

    let mut writer = BufWriter::new(out);
    let rendered = compiled.render_to(&mut writer);
    let flushed = writer.flush();
    rendered?;
    flushed?;
    debug!("Template streamed to output");
    Ok(())
}
