    use clap::Parser;
    use std::fs;
    use std::path::Path;

    use crate::cli::{Cli, execute};
    use zapsite::PatchError;

    const ZAP_FILE: &str =
        "package svc\n\nimport \"go.uber.org/zap\"\n\nfunc Start() {\n\tzap.L().Info(\"started\")\n}\n";

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("zapsite").chain(args.iter().copied())).unwrap()
    }

    fn run_in(dir: &Path, extra: &[&str]) -> Result<String, PatchError> {
        let path = dir.to_string_lossy().into_owned();
        let mut args = vec!["--path", path.as_str()];
        args.extend_from_slice(extra);
        let mut buf = Vec::new();
        execute(&parse(&args), &mut buf)?;
        Ok(String::from_utf8(buf).unwrap())
    }

    // ─── Flag parsing ───────────────────────────────────────────

    #[test]
    fn test_default_flags() {
        let cli = parse(&[]);
        assert_eq!(cli.path, Path::new("."));
        assert_eq!(cli.position, -1);
        assert_eq!(cli.log_level, "warn");

        let config = cli.to_config().unwrap();
        assert_eq!(config.field_key, "fl");
        assert_eq!(config.delete_key, None);
        assert_eq!(config.position, None);
        assert!(!config.write && !config.verify && !config.sort && !config.with_func);
    }

    #[test]
    fn test_all_flags() {
        let cli = parse(&[
            "--field", "file:line", "--write", "--with-func", "--sort", "--position", "2",
            "--exclude", "a,b",
        ]);
        let config = cli.to_config().unwrap();
        assert_eq!(config.field_key, "file:line");
        assert_eq!(config.position, Some(2));
        assert!(config.write && config.with_func && config.sort);
        assert_eq!(cli.exclude, "a,b");
    }

    #[test]
    fn test_negative_position_means_first() {
        let config = parse(&["--position", "-5"]).to_config().unwrap();
        assert_eq!(config.position, None);
    }

    #[test]
    fn test_del_and_field_conflict() {
        let err = parse(&["--del", "file:line", "--field", "fl"]).to_config().unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot use --del and --field at the same time; remove one flag or let --field use its default"
        );
    }

    #[test]
    fn test_empty_del_is_not_a_conflict() {
        let config = parse(&["--del", "", "--field", "k"]).to_config().unwrap();
        assert_eq!(config.delete_key, None);
        assert_eq!(config.field_key, "k");
    }

    #[test]
    fn test_empty_field_rejected() {
        let err = parse(&["--field", ""]).to_config().unwrap_err();
        assert!(matches!(err, PatchError::InvalidArgs(_)));
    }

    // ─── End-to-end runs ────────────────────────────────────────

    #[test]
    fn test_conflict_fails_before_traversal() {
        let err = run_in(Path::new("/definitely/not/here"), &["--del", "x", "--field", "y"]).unwrap_err();
        assert!(matches!(err, PatchError::FlagConflict));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        assert!(run_in(Path::new("/definitely/not/here"), &[]).is_err());
    }

    #[test]
    fn test_execute_preview_then_write() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("svc.go");
        fs::write(&file, ZAP_FILE).unwrap();

        let preview = run_in(dir.path(), &[]).unwrap();
        assert!(preview.contains("[PATCH] svc.go"));
        assert!(preview.contains("--- snippet around L6 (svc.go) ---"));
        assert_eq!(fs::read_to_string(&file).unwrap(), ZAP_FILE);

        run_in(dir.path(), &["--write"]).unwrap();
        assert!(fs::read_to_string(&file).unwrap().contains("zap.String(\"fl\", \"svc.go:6\")"));

        let verify = run_in(dir.path(), &["--verify"]).unwrap();
        assert!(verify.contains("All injections look correct."));
    }

    #[test]
    fn test_execute_verify_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("svc.go"), ZAP_FILE).unwrap();

        let out = run_in(dir.path(), &["--verify", "--json"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["totalCalls"], 1);
        assert_eq!(value["missingCount"], 1);
        assert_eq!(value["issueFiles"][0], "svc.go");
    }

    #[test]
    fn test_execute_with_func_reads_go_mod() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("go.mod"), "module example.com/svc\n\ngo 1.22\n").unwrap();
        fs::write(dir.path().join("svc.go"), ZAP_FILE).unwrap();

        let out = run_in(dir.path(), &["--with-func"]).unwrap();
        assert!(out.contains("svc.go:6 | example.com/svc.Start"), "{out}");
    }
