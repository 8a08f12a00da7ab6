//! Module specifier grammar.

use crate::ModuleError;

/// Package name assumed when a specifier has no `Package.` prefix.
pub const DEFAULT_PACKAGE: &str = "xana";

/// Parsed module specifier: `Package.Class[:instance]`.
///
/// The package maps to a shared library (or the builtin registry, or a
/// script directory); the class selects the factory inside it; the optional
/// instance distinguishes several configurations of one class.
///
/// ```
/// use xana_module::ModuleSpec;
///
/// let spec = ModuleSpec::parse("Dump.Printer:brief").unwrap();
/// assert_eq!(spec.package(), "Dump");
/// assert_eq!(spec.class(), "Printer");
/// assert_eq!(spec.full_name(), "Dump.Printer:brief");
///
/// let spec = ModuleSpec::parse("Printer").unwrap();
/// assert_eq!(spec.package(), "xana");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    package: String,
    class: String,
    instance: Option<String>,
}

impl ModuleSpec {
    /// Parses a specifier, defaulting the package when absent.
    ///
    /// # Errors
    ///
    /// [`ModuleError::InvalidName`] when any component is empty or the class
    /// contains a further `.`.
    pub fn parse(spec: &str) -> Result<Self, ModuleError> {
        let invalid = || ModuleError::InvalidName(spec.to_owned());

        let (path, instance) = match spec.split_once(':') {
            Some((path, instance)) => {
                if instance.is_empty() {
                    return Err(invalid());
                }
                (path, Some(instance.to_owned()))
            }
            None => (spec, None),
        };

        let (package, class) = match path.split_once('.') {
            Some((package, class)) => (package, class),
            None => (DEFAULT_PACKAGE, path),
        };
        if package.is_empty() || class.is_empty() || class.contains('.') {
            return Err(invalid());
        }

        Ok(Self {
            package: package.to_owned(),
            class: class.to_owned(),
            instance,
        })
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// `Package.Class` without the instance suffix.
    #[must_use]
    pub fn class_path(&self) -> String {
        format!("{}.{}", self.package, self.class)
    }

    /// Full display name, `Package.Class[:instance]`.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.instance {
            Some(instance) => format!("{}.{}:{instance}", self.package, self.class),
            None => self.class_path(),
        }
    }

    /// Platform file name of the package library, `lib<Package>.so` on Linux.
    #[must_use]
    pub fn lib_name(&self) -> String {
        format!(
            "{}{}{}",
            std::env::consts::DLL_PREFIX,
            self.package,
            std::env::consts::DLL_SUFFIX
        )
    }

    /// Factory symbol for a user module of this class.
    #[must_use]
    pub fn module_symbol(&self) -> String {
        format!("_xana_module_{}", self.class)
    }

    /// Factory symbol for an input module of this class.
    #[must_use]
    pub fn input_module_symbol(&self) -> String {
        format!("_xana_input_module_{}", self.class)
    }
}

impl std::fmt::Display for ModuleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_grammar() {
        let spec = ModuleSpec::parse("XtcTools.Filter:tight").unwrap();
        assert_eq!(spec.package(), "XtcTools");
        assert_eq!(spec.class(), "Filter");
        assert_eq!(spec.instance(), Some("tight"));
        assert_eq!(spec.class_path(), "XtcTools.Filter");
        assert_eq!(spec.full_name(), "XtcTools.Filter:tight");
    }

    #[test]
    fn package_defaults() {
        let spec = ModuleSpec::parse("PrintEventId").unwrap();
        assert_eq!(spec.package(), DEFAULT_PACKAGE);
        assert_eq!(spec.full_name(), "xana.PrintEventId");
    }

    #[test]
    fn symbols() {
        let spec = ModuleSpec::parse("XtcTools.Filter").unwrap();
        assert_eq!(spec.module_symbol(), "_xana_module_Filter");
        assert_eq!(spec.input_module_symbol(), "_xana_input_module_Filter");
        assert!(spec.lib_name().contains("XtcTools"));
    }

    #[test]
    fn ill_formed_names_rejected() {
        for bad in ["", ".Class", "Pkg.", "Pkg.A.B", "Pkg.Class:", ":inst"] {
            let err = ModuleSpec::parse(bad).unwrap_err();
            assert!(
                matches!(err, ModuleError::InvalidName(_)),
                "expected invalid-name error for {bad:?}"
            );
        }
    }
}
