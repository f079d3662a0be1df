use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use quill_core::{ErrorKind, Value};

use crate::{interpret_file, StdIo};

/// A scratch directory unique to one test.
fn scratch(name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("quill-std-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    for (file, code) in files {
        fs::write(dir.join(file), code).unwrap();
    }
    dir
}

#[test]
fn interpret_file_seeds_this_path() {
    let dir = scratch("path", &[("main.ql", "print, hello;\n")]);
    let io = StdIo::captured(Vec::<String>::new());
    let (interpreter, frame) = interpret_file(&dir.join("main.ql"), io.clone()).unwrap();

    assert_eq!(io.output(), "hello\n");
    let path = frame.env().get("this_path").unwrap();
    assert!(path.to_string().ends_with("main.ql"), "{path}");
    assert!(interpreter.call_stack().is_empty());
}

#[test]
fn import_binds_or_merges() {
    let dir = scratch(
        "import",
        &[
            ("lib.ql", "set, greeting, 'hi';\nfunc, twice, x;\n    math, y, x, times, 2;\n    return, doubled, y;\nend, func;\n"),
            ("main.ql", "import, 'lib.ql', lib;\nprint, lib.greeting;\nimport, 'lib.ql';\ncall, twice, 21;\nprint, doubled;\n"),
        ],
    );
    let io = StdIo::captured(Vec::<String>::new());
    let (_, frame) = interpret_file(&dir.join("main.ql"), io.clone()).unwrap();

    assert_eq!(io.output(), "hi\n42\n");
    let env = frame.env();
    assert!(env.get("lib").is_some_and(|lib| lib.as_env().is_some()));
    assert_eq!(env.get("greeting"), Some(Value::str("hi")));
    // Merging does not overwrite the importer's own seeded names.
    assert!(env.get("this_path").unwrap().to_string().ends_with("main.ql"));
}

#[test]
fn reentrant_import_is_rejected() {
    let dir = scratch(
        "cycle",
        &[
            ("a.ql", "print, a;\nimport, 'b.ql';\n"),
            ("b.ql", "print, b;\nimport, 'a.ql';\n"),
        ],
    );
    let io = StdIo::captured(Vec::<String>::new());
    let err = interpret_file(&dir.join("a.ql"), io.clone()).err().unwrap();

    assert_eq!(io.output(), "a\nb\n");
    assert!(matches!(err.kind(), ErrorKind::ReentrantLoad { path } if path.ends_with("a.ql")));
    // One location in b.ql, one in a.ql.
    assert_eq!(err.trail().len(), 2);
    assert!(err.to_string().contains("is already being interpreted"));
}

#[test]
fn missing_file_is_a_foreign_error() {
    let dir = scratch("missing", &[("main.ql", "import, 'nowhere.ql';\n")]);
    let err = interpret_file(&dir.join("main.ql"), StdIo::captured(Vec::<String>::new())).err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::Foreign { .. }));
    assert_eq!(err.trail()[0].line, 1);
}
