//! Widget class registry.
//!
//! Maps `(module, version)` to the classes the module exports. The three
//! ipywidgets modules are registered eagerly; anything else (third-party
//! widget libraries) is resolved on first use through an injected
//! [`ModuleLoader`] and cached for the life of the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use log::debug;

use crate::error::WidgetError;

pub const BASE_MODULE: &str = "@jupyter-widgets/base";
pub const CONTROLS_MODULE: &str = "@jupyter-widgets/controls";
pub const OUTPUT_MODULE: &str = "@jupyter-widgets/output";

pub const BASE_VERSION: &str = "2.0.0";
pub const CONTROLS_VERSION: &str = "2.0.0";
pub const OUTPUT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Model,
    View,
}

/// A class exported by a widget module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetClass {
    pub name: String,
    pub module: String,
    pub version: String,
    pub kind: ClassKind,
}

impl WidgetClass {
    /// `module@version:Name`
    pub fn qualified_name(&self) -> String {
        format!("{}@{}:{}", self.module, self.version, self.name)
    }

    pub fn is_view(&self) -> bool {
        self.kind == ClassKind::View
    }
}

/// The classes one module version exports, by class name.
#[derive(Debug, Clone)]
pub struct ModuleExports {
    pub module: String,
    pub version: String,
    classes: HashMap<String, WidgetClass>,
}

impl ModuleExports {
    pub fn new(module: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            version: version.into(),
            classes: HashMap::new(),
        }
    }

    pub fn with_model(self, name: &str) -> Self {
        self.with_class(name, ClassKind::Model)
    }

    pub fn with_view(self, name: &str) -> Self {
        self.with_class(name, ClassKind::View)
    }

    fn with_class(mut self, name: &str, kind: ClassKind) -> Self {
        let class = WidgetClass {
            name: name.to_string(),
            module: self.module.clone(),
            version: self.version.clone(),
            kind,
        };
        self.classes.insert(name.to_string(), class);
        self
    }

    pub fn get(&self, class_name: &str) -> Option<&WidgetClass> {
        self.classes.get(class_name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Resolves non-builtin widget modules.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, module: &str, version: &str) -> Result<ModuleExports>;
}

/// A [`ModuleLoader`] backed by a closure returning a boxed future.
pub struct FnLoader<F>(pub F);

#[async_trait]
impl<F> ModuleLoader for FnLoader<F>
where
    F: Fn(String, String) -> BoxFuture<'static, Result<ModuleExports>> + Send + Sync,
{
    async fn load(&self, module: &str, version: &str) -> Result<ModuleExports> {
        (self.0)(module.to_string(), version.to_string()).await
    }
}

fn base_exports() -> ModuleExports {
    ModuleExports::new(BASE_MODULE, BASE_VERSION)
        .with_model("WidgetModel")
        .with_view("WidgetView")
        .with_model("DOMWidgetModel")
        .with_view("DOMWidgetView")
        .with_model("LayoutModel")
        .with_view("LayoutView")
        .with_model("StyleModel")
        .with_view("StyleView")
}

fn controls_exports() -> ModuleExports {
    let mut exports = ModuleExports::new(CONTROLS_MODULE, CONTROLS_VERSION);
    for widget in [
        "IntSlider",
        "FloatSlider",
        "IntText",
        "FloatText",
        "Text",
        "Textarea",
        "Checkbox",
        "ToggleButton",
        "Button",
        "Dropdown",
        "Label",
        "HTML",
        "HTMLMath",
        "Image",
        "Play",
        "IntProgress",
        "FloatProgress",
        "Box",
        "HBox",
        "VBox",
        "GridBox",
        "Accordion",
        "Tab",
    ] {
        exports = exports
            .with_model(&format!("{}Model", widget))
            .with_view(&format!("{}View", widget));
    }
    for style in ["SliderStyle", "ButtonStyle", "DescriptionStyle", "ProgressStyle"] {
        exports = exports.with_model(&format!("{}Model", style));
    }
    exports
}

fn output_exports() -> ModuleExports {
    ModuleExports::new(OUTPUT_MODULE, OUTPUT_VERSION)
        .with_model("OutputModel")
        .with_view("OutputView")
}

/// Whether a registered `version` satisfies a requested version or range.
///
/// Widget state carries versions like `2.0.0`, `^2.0.0` or `~1.0`; modules
/// are compatible when the major versions agree. Range operators are not
/// evaluated beyond that, so `~1.2` accepts any 1.x. A wildcard or a missing
/// version accepts whatever is registered.
fn version_satisfies(registered: &str, requested: &str) -> bool {
    let requested = requested.trim();
    if requested.is_empty() || requested == "*" {
        return true;
    }
    fn major(v: &str) -> Option<&str> {
        v.trim_start_matches(['^', '~', '=', 'v'])
            .split('.')
            .next()
            .filter(|m| !m.is_empty())
    }
    match (major(registered), major(requested)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Class registry scoped to one widget manager.
pub struct ModuleRegistry {
    builtins: HashMap<String, Arc<ModuleExports>>,
    loaded: StdMutex<HashMap<(String, String), Arc<ModuleExports>>>,
    loader: Option<Arc<dyn ModuleLoader>>,
}

impl ModuleRegistry {
    pub fn new(loader: Option<Arc<dyn ModuleLoader>>) -> Self {
        let builtins = [base_exports(), controls_exports(), output_exports()]
            .into_iter()
            .map(|exports| (exports.module.clone(), Arc::new(exports)))
            .collect();
        Self {
            builtins,
            loaded: StdMutex::new(HashMap::new()),
            loader,
        }
    }

    pub fn is_builtin(module: &str) -> bool {
        matches!(module, BASE_MODULE | CONTROLS_MODULE | OUTPUT_MODULE)
    }

    /// Resolve `class_name` exported by `module` at `version`.
    pub async fn load_class(
        &self,
        class_name: &str,
        module: &str,
        version: &str,
    ) -> Result<WidgetClass, WidgetError> {
        let exports = self.resolve_module(module, version).await?;
        exports
            .get(class_name)
            .cloned()
            .ok_or_else(|| WidgetError::ClassNotFound {
                class_name: class_name.to_string(),
                module: module.to_string(),
                version: version.to_string(),
            })
    }

    async fn resolve_module(
        &self,
        module: &str,
        version: &str,
    ) -> Result<Arc<ModuleExports>, WidgetError> {
        let not_found = || WidgetError::ModuleNotFound {
            module: module.to_string(),
            version: version.to_string(),
        };

        if Self::is_builtin(module) {
            let exports = self.builtins.get(module).ok_or_else(not_found)?;
            if !version_satisfies(&exports.version, version) {
                return Err(not_found());
            }
            return Ok(exports.clone());
        }

        let key = (module.to_string(), version.to_string());
        if let Some(exports) = self.cached(&key) {
            return Ok(exports);
        }

        let loader = self.loader.as_ref().ok_or_else(not_found)?;
        debug!("[widgets] loading module {}@{}", module, version);
        let exports = Arc::new(loader.load(module, version).await?);

        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        Ok(loaded.entry(key).or_insert(exports).clone())
    }

    fn cached(&self, key: &(String, String)) -> Option<Arc<ModuleExports>> {
        self.loaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModuleLoader for CountingLoader {
        async fn load(&self, module: &str, version: &str) -> Result<ModuleExports> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if module == "missing-module" {
                anyhow::bail!("no such package: {}", module);
            }
            Ok(ModuleExports::new(module, version)
                .with_model("AnyModel")
                .with_view("AnyView"))
        }
    }

    #[tokio::test]
    async fn test_builtin_class_resolves_without_loader() {
        let registry = ModuleRegistry::new(None);
        let class = registry
            .load_class("IntSliderView", CONTROLS_MODULE, "2.0.0")
            .await
            .unwrap();
        assert!(class.is_view());
        assert_eq!(
            class.qualified_name(),
            "@jupyter-widgets/controls@2.0.0:IntSliderView"
        );
    }

    #[tokio::test]
    async fn test_builtin_accepts_compatible_range() {
        let registry = ModuleRegistry::new(None);
        assert!(registry
            .load_class("OutputModel", OUTPUT_MODULE, "^1.0.0")
            .await
            .is_ok());
        assert!(matches!(
            registry.load_class("OutputModel", OUTPUT_MODULE, "3.0.0").await,
            Err(WidgetError::ModuleNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_builtin_without_version_resolves() {
        let registry = ModuleRegistry::new(None);
        assert!(registry.load_class("HTMLView", CONTROLS_MODULE, "").await.is_ok());
        assert!(registry.load_class("OutputView", OUTPUT_MODULE, "*").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_class_in_builtin() {
        let registry = ModuleRegistry::new(None);
        let err = registry
            .load_class("NopeModel", BASE_MODULE, "2.0.0")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Class NopeModel not found in module @jupyter-widgets/base@2.0.0"
        );
    }

    #[tokio::test]
    async fn test_third_party_module_without_loader() {
        let registry = ModuleRegistry::new(None);
        assert!(matches!(
            registry.load_class("AnyModel", "anywidget", "0.9.0").await,
            Err(WidgetError::ModuleNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_loader_result_is_cached() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let registry = ModuleRegistry::new(Some(loader.clone()));

        registry
            .load_class("AnyModel", "anywidget", "0.9.0")
            .await
            .unwrap();
        registry
            .load_class("AnyView", "anywidget", "0.9.0")
            .await
            .unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);

        // A different version is a different key
        registry
            .load_class("AnyModel", "anywidget", "1.0.0")
            .await
            .unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_loaded_module_missing_export() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let registry = ModuleRegistry::new(Some(loader));
        assert!(matches!(
            registry.load_class("Missing", "anywidget", "0.9.0").await,
            Err(WidgetError::ClassNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_loader_failure_propagates() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let registry = ModuleRegistry::new(Some(loader));
        assert!(matches!(
            registry.load_class("X", "missing-module", "1.0.0").await,
            Err(WidgetError::Loader(_))
        ));
    }

    #[tokio::test]
    async fn test_fn_loader() {
        let loader = FnLoader(|module: String, version: String| {
            Box::pin(async move { Ok(ModuleExports::new(module, version).with_view("MapView")) })
                as BoxFuture<'static, Result<ModuleExports>>
        });
        let exports = loader.load("jupyter-leaflet", "0.19.0").await.unwrap();
        assert_eq!(exports.module, "jupyter-leaflet");
        assert!(exports.get("MapView").is_some());
        assert_eq!(exports.len(), 1);
    }

    #[test]
    fn test_version_satisfies() {
        assert!(version_satisfies("2.0.0", "2.0.0"));
        assert!(version_satisfies("2.0.0", "^2.1.0"));
        assert!(version_satisfies("1.0.0", "~1.0"));
        assert!(!version_satisfies("2.0.0", "1.5.0"));
        assert!(version_satisfies("2.0.0", ""));
        assert!(version_satisfies("1.0.0", "*"));
        assert!(!version_satisfies("", "1.0.0"));
    }

    #[test]
    fn test_builtin_exports_contents() {
        assert!(base_exports().get("DOMWidgetView").is_some());
        assert!(controls_exports().get("VBoxModel").is_some());
        assert_eq!(
            controls_exports().get("SliderStyleModel").map(|c| c.kind),
            Some(ClassKind::Model)
        );
        assert!(!output_exports().is_empty());
    }
}
