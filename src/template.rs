//! Template composition and execution against a value tree.
//!
//! A composed template is one Tera namespace holding a root template plus
//! zero or more named sub-templates, all sharing the function library and
//! an `include(name, data)` function so any sub-template can invoke any
//! other by name, recursively. The output destination is itself a small
//! template evaluated against the current value tree, so per-iteration
//! filenames like `out_{{ n }}.rs` fall out for free.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tera::{Context, Tera};

use crate::error::{Error, Result};
use crate::functions;
use crate::output::OutputCache;
use crate::values::ValueTree;

/// Root template plus named, mutually-includable sub-templates sharing one
/// namespace, and the output-name template they render into.
pub struct ComposedTemplate {
    tera: Tera,
    root: String,
    output: String,
}

impl ComposedTemplate {
    /// Composes the templates in `files` under one namespace.
    ///
    /// The first file becomes the root; every subsequent file becomes a
    /// sub-template addressable by its base file name via `include`. Read
    /// and parse errors are tagged with the offending file.
    pub fn from_files<P: AsRef<Path>>(files: &[P], output: &str) -> Result<Self> {
        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            let file = file.as_ref();
            let content = fs::read_to_string(file)
                .map_err(|err| Error::from(err).in_file(file.display().to_string()))?;
            sources.push((template_name(file), content));
        }
        Self::from_sources(&sources, output)
    }

    /// Composes from in-memory `(name, content)` pairs; the first pair is
    /// the root template.
    pub fn from_sources(sources: &[(String, String)], output: &str) -> Result<Self> {
        let root = sources
            .first()
            .map(|(name, _)| name.clone())
            .ok_or_else(|| Error::Tera(tera::Error::msg("no template sources given")))?;

        let mut tera = Tera::default();
        // Source code generation, never HTML: no escaping.
        tera.autoescape_on(vec![]);
        for (name, content) in sources {
            tera.add_raw_template(name, content)
                .map_err(|err| Error::Tera(err).in_file(name.clone()))?;
        }
        functions::register_all(&mut tera);
        let namespace = register_include(&mut tera);
        // Snapshot taken after registration so included templates can
        // themselves call include.
        let _ = namespace.set(tera.clone());

        Ok(Self {
            tera,
            root,
            output: output.to_string(),
        })
    }

    /// Renders the output-name template against the current value tree.
    pub fn resolve_output_name(&self, tree: &ValueTree) -> Result<String> {
        let context = Context::from_serialize(tree)?;
        Ok(Tera::one_off(&self.output, &context, false)?)
    }

    /// Resolves the output name, asks the cache for its writer, and renders
    /// the root template into it. Writes accumulate on whatever writer the
    /// cache returns, fresh or reused from an earlier iteration.
    pub fn execute(&self, tree: &ValueTree, cache: &mut OutputCache) -> Result<()> {
        let name = self.resolve_output_name(tree)?;
        let writer = cache.resolve(&name)?;
        let context = Context::from_serialize(tree)?;
        self.tera.render_to(&self.root, &context, writer)?;
        Ok(())
    }
}

fn template_name(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string())
}

/// Registers `include(name, data)` backed by a snapshot of the composed
/// namespace, set once composition is complete.
fn register_include(tera: &mut Tera) -> Arc<OnceLock<Tera>> {
    let namespace: Arc<OnceLock<Tera>> = Arc::new(OnceLock::new());
    let captured = Arc::clone(&namespace);
    tera.register_function(
        "include",
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let engine = captured
                .get()
                .ok_or_else(|| tera::Error::msg("include: template namespace not initialized"))?;
            let name = args
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| tera::Error::msg("include: missing required argument `name`"))?;
            let data = args.get("data").cloned().unwrap_or(Value::Null);
            let context = functions::context_for(&data)?;
            engine.render(name, &context).map(Value::String)
        },
    );
    namespace
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn tree_of(value: Value) -> ValueTree {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_root_renders_tree_values() {
        let sources = vec![(
            "root.tmpl".to_string(),
            "{{ greeting }}, {{ who.name }}!".to_string(),
        )];
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hello.txt").to_string_lossy().to_string();
        let template = ComposedTemplate::from_sources(&sources, &out).unwrap();
        let tree = tree_of(json!({"greeting": "hello", "who": {"name": "world"}}));

        let mut cache = OutputCache::new();
        template.execute(&tree, &mut cache).unwrap();
        cache.close_all();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello, world!");
    }

    #[test]
    fn test_include_invokes_named_sub_template() {
        let sources = vec![
            (
                "root.tmpl".to_string(),
                "{{ include(name=\"item.tmpl\", data=part) }}".to_string(),
            ),
            ("item.tmpl".to_string(), "part {{ id }}".to_string()),
        ];
        let template = ComposedTemplate::from_sources(&sources, "ignored").unwrap();
        let tree = tree_of(json!({"part": {"id": 9}}));
        let name = template.resolve_output_name(&tree).unwrap();
        assert_eq!(name, "ignored");

        let mut cache = OutputCache::new();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o.txt");
        cache.pre_open("ignored", Box::new(std::fs::File::create(&out).unwrap()));
        template.execute(&tree, &mut cache).unwrap();
        cache.close_all();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "part 9");
    }

    #[test]
    fn test_include_is_reentrant() {
        let sources = vec![
            (
                "root.tmpl".to_string(),
                "{{ include(name=\"outer.tmpl\", data=data) }}".to_string(),
            ),
            (
                "outer.tmpl".to_string(),
                "[{{ include(name=\"inner.tmpl\", data=nested) }}]".to_string(),
            ),
            ("inner.tmpl".to_string(), "{{ label }}".to_string()),
        ];
        let template = ComposedTemplate::from_sources(&sources, "out").unwrap();
        let tree = tree_of(json!({"data": {"nested": {"label": "deep"}}}));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o.txt");
        let mut cache = OutputCache::new();
        cache.pre_open("out", Box::new(std::fs::File::create(&out).unwrap()));
        template.execute(&tree, &mut cache).unwrap();
        cache.close_all();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "[deep]");
    }

    #[test]
    fn test_output_name_is_computed_from_tree() {
        let sources = vec![("root.tmpl".to_string(), "x".to_string())];
        let template = ComposedTemplate::from_sources(&sources, "out_{{ n }}.rs").unwrap();
        let tree = tree_of(json!({"n": 7}));
        assert_eq!(template.resolve_output_name(&tree).unwrap(), "out_7.rs");
    }

    #[test]
    fn test_library_functions_available_in_templates() {
        let sources = vec![(
            "root.tmpl".to_string(),
            "{{ tplMap(template=\"{{ value }}\", items=seq(from=1, to=3)) | join(sep=\"-\") }}"
                .to_string(),
        )];
        let template = ComposedTemplate::from_sources(&sources, "out").unwrap();
        let tree = Map::new();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o.txt");
        let mut cache = OutputCache::new();
        cache.pre_open("out", Box::new(std::fs::File::create(&out).unwrap()));
        template.execute(&tree, &mut cache).unwrap();
        cache.close_all();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "1-2-3");
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let sources = vec![("broken.tmpl".to_string(), "{{ unclosed".to_string())];
        let err = ComposedTemplate::from_sources(&sources, "out")
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().starts_with("broken.tmpl:"));
    }

    #[test]
    fn test_from_files_tags_missing_file() {
        let err = ComposedTemplate::from_files(&[Path::new("no-such.tmpl")], "out")
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().starts_with("no-such.tmpl:"));
    }

    #[test]
    fn test_same_output_across_renders_accumulates() {
        let sources = vec![("root.tmpl".to_string(), "{{ n }};".to_string())];
        let template = ComposedTemplate::from_sources(&sources, "acc").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("acc.txt");
        let mut cache = OutputCache::new();
        cache.pre_open("acc", Box::new(std::fs::File::create(&out).unwrap()));
        for n in 1..=3 {
            let tree = tree_of(json!({"n": n}));
            template.execute(&tree, &mut cache).unwrap();
        }
        cache.close_all();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "1;2;3;");
    }
}
