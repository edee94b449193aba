//! Packages located and built from layered settings.
//!
//! Every test runs inside a figment `Jail` so environment overrides set by
//! one test are never seen by another.

use crate::common::{TPKG, fixtures_dir};
use srcpkg::{Package, PackageError, Settings};

fn settings_toml() -> String {
    let fixtures = fixtures_dir();
    format!(
        "[context]\nsource_dir = \"{}\"\ngoroot = \"{}\"\ngopath = [\"{}\"]\ngoos = \"linux\"\ngoarch = \"amd64\"\n\n[logging]\nlevel = \"warn\"\n",
        fixtures.join("gopath").join("src").display(),
        fixtures.join("goroot").display(),
        fixtures.join("gopath").display(),
    )
}

#[test]
fn test_package_from_settings_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("settings.toml", &settings_toml())?;
        let settings = Settings::load_from("settings.toml").map_err(|e| *e)?;
        assert_eq!(settings.logging.level, "warn");

        let package = Package::from_settings(&settings, TPKG).expect("package resolves");
        assert_eq!(package.name(), "tpkg");
        assert_eq!(package.methods().expect("package builds").len(), 2);
        Ok(())
    });
}

#[test]
fn test_parse_options_from_settings() {
    figment::Jail::expect_with(|jail| {
        let toml = format!("{}\n[parse]\ninclude_tests = false\n", settings_toml());
        jail.create_file("settings.toml", &toml)?;
        let settings = Settings::load_from("settings.toml").map_err(|e| *e)?;
        assert!(!settings.parse.include_tests);

        let package = Package::from_settings(&settings, TPKG).expect("package resolves");
        assert!(package.docs().expect("package builds").examples().is_empty());
        assert_eq!(
            package.files().names().expect("package builds"),
            vec!["doc.go", "tpkg.go", "tpkg_private.go"]
        );
        Ok(())
    });
}

#[test]
fn test_environment_selects_the_target() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("settings.toml", &settings_toml())?;
        jail.set_env("SRCPKG_CONTEXT__GOOS", "windows");
        let settings = Settings::load_from("settings.toml").map_err(|e| *e)?;
        assert_eq!(settings.context.goos, "windows");

        // the windows file redeclares FuncOne
        let package = Package::from_settings(&settings, TPKG).expect("package resolves");
        assert!(matches!(
            package.functions(),
            Err(PackageError::TypeCheck { .. })
        ));
        Ok(())
    });
}
