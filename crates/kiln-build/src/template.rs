use handlebars::Handlebars;
use kiln_core::PropertySet;
use kiln_core::recipe::RECIPE_FILE_NAME;
use std::path::{Path, PathBuf};

/// Renders recipes and command strings against a [`PropertySet`].
///
/// Properties are bound as top-level variables (`{{IMAGE_VERSION}}`).
/// Output is never HTML-escaped.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    pub fn render_str(&self, template: &str, props: &PropertySet) -> Result<String, TemplateError> {
        self.registry
            .render_template(template, props)
            .map_err(|e| TemplateError::Render {
                template: template.to_owned(),
                source: Box::new(e),
            })
    }

    /// Render the template file `input` into `output`.
    ///
    /// Missing parent directories of `output` are created and the
    /// permission bits of `input` are copied onto it.
    pub fn render_file(
        &self,
        input: &Path,
        output: &Path,
        props: &PropertySet,
    ) -> Result<(), TemplateError> {
        let template = std::fs::read_to_string(input).map_err(|e| TemplateError::Read {
            path: input.to_path_buf(),
            source: e,
        })?;
        let rendered = self
            .registry
            .render_template(&template, props)
            .map_err(|e| TemplateError::RenderFile {
                path: input.to_path_buf(),
                source: Box::new(e),
            })?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TemplateError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(output, rendered).map_err(|e| TemplateError::Write {
            path: output.to_path_buf(),
            source: e,
        })?;

        let permissions = std::fs::metadata(input)
            .map_err(|e| TemplateError::Read {
                path: input.to_path_buf(),
                source: e,
            })?
            .permissions();
        std::fs::set_permissions(output, permissions).map_err(|e| TemplateError::Write {
            path: output.to_path_buf(),
            source: e,
        })
    }

    /// Fill a recipe for the `fill-template` command.
    ///
    /// When `input` does not exist and is not itself a `.template` file,
    /// the `Dockerfile.template` next to it is used instead. Identical
    /// input and output paths are left untouched.
    pub fn fill_template(
        &self,
        input: &Path,
        output: &Path,
        props: &PropertySet,
    ) -> Result<(), TemplateError> {
        let input = resolve_template_input(input)?;

        if input == output {
            println!(
                "Skipping templating for {} (input path is the same as output)",
                input.display()
            );
            return Ok(());
        }

        println!("Templating {} to {}", input.display(), output.display());
        self.render_file(&input, output, props)
    }
}

fn resolve_template_input(input: &Path) -> Result<PathBuf, TemplateError> {
    if input.exists() {
        return Ok(input.to_path_buf());
    }
    if input.extension().is_some_and(|ext| ext == "template") {
        return Err(TemplateError::NotFound(input.to_path_buf()));
    }

    let fallback = input
        .parent()
        .map(|dir| dir.join(RECIPE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(RECIPE_FILE_NAME));
    if fallback.exists() {
        tracing::debug!(path = %fallback.display(), "using recipe template next to missing input");
        Ok(fallback)
    } else {
        Err(TemplateError::NoTemplate {
            input: input.to_path_buf(),
            template: fallback,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("{0} does not exist")]
    NotFound(PathBuf),

    #[error("neither {input} nor {template} exists")]
    NoTemplate { input: PathBuf, template: PathBuf },

    #[error("failed to read template {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render template {path}")]
    RenderFile {
        path: PathBuf,
        source: Box<handlebars::RenderError>,
    },

    #[error("failed to render {template:?}")]
    Render {
        template: String,
        source: Box<handlebars::RenderError>,
    },

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
