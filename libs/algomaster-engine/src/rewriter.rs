/// File-I/O Rewriter
///
/// Contest-style programs often read `problem.in` and write `problem.out`
/// instead of using stdin/stdout. The runner only sees stdout, so such
/// programs are wrapped: the user's `main` is renamed, and a generated
/// `main` writes the case input to `problem.in`, runs the user's code, then
/// replays `problem.out` onto the real stdout.
///
/// Detection is a textual heuristic, not a C++ parser: any line that is not
/// a `//` comment and mentions `freopen` or `ifstream` counts.

use handlebars::Handlebars;
use serde_json::json;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to render file I/O wrapper: {0}")]
pub struct TemplateError(#[from] handlebars::RenderError);

const FILE_IO_WRAPPER_TEMPLATE: &str = r#"
#include <fstream>
#include <iostream>
#include <vector>
#include <string>
#include <unistd.h>
#include <cstdio>

// Rename user main so we can wrap it
#define main _user_main

{{user_code}}

#undef main

int main() {
    // 1. Create problem.in from the test case input
    std::ofstream in("problem.in");
    in << "{{escaped_input}}";
    in.close();

    // 2. Save original stdout fd
    int original_stdout = dup(fileno(stdout));

    // 3. Run user main (which might freopen stdout)
    _user_main();

    // 4. Restore stdout
    fflush(stdout);
    dup2(original_stdout, fileno(stdout));
    close(original_stdout);

    // 5. Read problem.out and print to restored stdout
    std::ifstream out("problem.out");
    if (out) {
        std::cout << out.rdbuf();
    }

    return 0;
}
"#;

/// Whether any uncommented line appears to use file-based I/O
pub fn uses_file_io(code: &str) -> bool {
    code.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.starts_with("//") && (trimmed.contains("freopen") || trimmed.contains("ifstream"))
    })
}

/// Escape text for use inside a C++ double-quoted string literal
///
/// Backslashes, double quotes and newlines are escaped; carriage returns
/// are dropped.
pub fn escape_cpp_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}

/// Wrap a file-I/O program so its `problem.out` ends up on stdout
pub fn wrap_file_io(code: &str, stdin: &str) -> Result<String, TemplateError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);

    let data = json!({
        "user_code": code,
        "escaped_input": escape_cpp_string(stdin),
    });

    Ok(handlebars.render_template(FILE_IO_WRAPPER_TEMPLATE, &data)?)
}

/// The source actually submitted for one test case
///
/// Programs using plain stdin/stdout are passed through untouched.
pub fn prepare_source<'a>(code: &'a str, stdin: &str) -> Result<Cow<'a, str>, TemplateError> {
    if uses_file_io(code) {
        Ok(Cow::Owned(wrap_file_io(code, stdin)?))
    } else {
        Ok(Cow::Borrowed(code))
    }
}
