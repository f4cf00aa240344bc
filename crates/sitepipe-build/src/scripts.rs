//! Script task: TypeScript/ES transpiling, vendor scripts and minification.
//!
//! In development each transpiled source carries its own inline source map
//! comment, so the concatenated bundle maps back to the original files.

use std::fs;
use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::config::BuildConfig;
use crate::task::{source_files, write_output, BuildError, BuildTask, TaskKind};

/// Name of the bundled script inside the js output folder.
pub const MAIN_JS: &str = "main.js";

/// Language level the transpiled scripts are lowered to.
const SCRIPT_TARGET: &str = "es2015";

/// Transpiles `scripts/*.ts` and `scripts/*.js` plus vendor scripts into
/// `js/main.js`.
#[derive(Debug, Default)]
pub struct ScriptsTask;

impl BuildTask for ScriptsTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Scripts
    }

    fn run(&self, config: &BuildConfig) -> Result<Vec<PathBuf>, BuildError> {
        let mut chunks = Vec::new();

        for vendor in &config.vendor_js {
            if !vendor.exists() {
                tracing::warn!("Vendor script not found: {}", vendor.display());
                continue;
            }
            let source = fs::read_to_string(vendor).map_err(|e| BuildError::read(vendor, e))?;
            // Vendor code is shipped as-is unless it has to be minified.
            if config.minify {
                chunks.push(emit(vendor, &source, false, true, false)?);
            } else {
                chunks.push(source);
            }
        }

        for path in source_files(&config.scripts_dir(), &["ts", "js"])? {
            tracing::debug!("Transpiling {}", path.display());
            let source = fs::read_to_string(&path).map_err(|e| BuildError::read(&path, e))?;
            chunks.push(transpile(&path, &source, config.minify, config.source_maps)?);
        }

        let output = config.js_output().join(MAIN_JS);
        write_output(&output, chunks.join("\n"))?;

        Ok(vec![output])
    }
}

/// Strip types and lower syntax to [`SCRIPT_TARGET`].
///
/// With `source_map` the output ends in a `sourceMappingURL` comment holding
/// the map as a data URL.
pub fn transpile(
    path: &Path,
    source: &str,
    minify: bool,
    source_map: bool,
) -> Result<String, BuildError> {
    emit(path, source, true, minify, source_map)
}

fn emit(
    path: &Path,
    source: &str,
    transform: bool,
    minify: bool,
    source_map: bool,
) -> Result<String, BuildError> {
    let script_error = |message: String| BuildError::ScriptError {
        path: path.display().to_string(),
        message,
    };

    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).map_err(|e| script_error(e.to_string()))?;

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        return Err(script_error(join_messages(&parsed.errors)));
    }
    let mut program = parsed.program;

    if transform {
        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        let options = TransformOptions::from_target(SCRIPT_TARGET).map_err(script_error)?;
        let transformed =
            Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
        if !transformed.errors.is_empty() {
            return Err(script_error(join_messages(&transformed.errors)));
        }
    }

    let mut options = if minify {
        CodegenOptions::minify()
    } else {
        CodegenOptions::default()
    };
    if source_map {
        options.source_map_path = Some(path.to_path_buf());
    }

    let generated = Codegen::new().with_options(options).build(&program);
    let mut code = generated.code;
    if let Some(map) = generated.map {
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("//# sourceMappingURL=");
        code.push_str(&map.to_data_url());
        code.push('\n');
    }

    Ok(code)
}

fn join_messages<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
