use std::path::PathBuf;

use ilc_ssa::OptLevel;
use pretty_assertions::assert_eq;

use super::*;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn input_alone_uses_defaults() {
    let options = parse_build_options(&args(&["demo/app.json"])).unwrap();
    assert_eq!(
        options,
        BuildOptions {
            input: PathBuf::from("demo/app.json"),
            output: None,
            module: None,
            opt_level: OptLevel::O0,
            verbose: false,
        }
    );
    assert_eq!(options.module_name(), "app");
}

#[test]
fn all_options_are_recognized() {
    let options = parse_build_options(&args(&["-v", "app.json", "-o", "out.ll", "--module=core", "--opt=2"])).unwrap();
    assert_eq!(options.output, Some(PathBuf::from("out.ll")));
    assert_eq!(options.module_name(), "core");
    assert_eq!(options.opt_level, OptLevel::O2);
    assert!(options.verbose);
}

#[test]
fn short_optimization_flag() {
    let options = parse_build_options(&args(&["app.json", "-O3"])).unwrap();
    assert_eq!(options.opt_level, OptLevel::O3);
}

#[test]
fn bad_arguments_are_usage_errors() {
    for bad in [&["-o"][..], &[][..], &["a.json", "b.json"][..], &["a.json", "--fast"][..]] {
        let err = parse_build_options(&args(bad)).unwrap_err();
        assert!(matches!(err, DriverError::Usage(_)), "{bad:?}: {err:?}");
    }
}

#[test]
fn bad_optimization_level_is_reported() {
    let err = parse_build_options(&args(&["a.json", "--opt=9"])).unwrap_err();
    assert!(matches!(err, DriverError::OptLevel(_)), "{err:?}");
}
