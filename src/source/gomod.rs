//! go.mod parsing
//!
//! Understands the directive grammar of go.mod files: single-line directives
//! (`require example.com/m v1.2.3`), parenthesised blocks, `//` comments and
//! quoted module paths. Only the module path and the `require` directives are
//! retained; other directives are validated and dropped.

use thiserror::Error;

use crate::domain::{Manifest, ModuleRequirement};

#[derive(Debug, Error, PartialEq)]
#[error("{path}:{line}: {message}")]
pub struct ManifestError {
    pub path: String,
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Open,
    Close,
}

fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' if line[start..].starts_with("//") => break,
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut word = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, escaped)) => word.push(escaped),
                            None => break,
                        },
                        c => word.push(c),
                    }
                }
                if !closed {
                    return Err("unterminated quoted string".to_string());
                }
                tokens.push(Token::Word(word));
            }
            '`' => {
                chars.next();
                let mut word = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '`' {
                        closed = true;
                        break;
                    }
                    word.push(c);
                }
                if !closed {
                    return Err("unterminated raw string".to_string());
                }
                tokens.push(Token::Word(word));
            }
            _ => {
                let mut end = line.len();
                while let Some(&(idx, c)) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"' | '`') {
                        end = idx;
                        break;
                    }
                    chars.next();
                }
                tokens.push(Token::Word(line[start..end].to_string()));
            }
        }
    }

    Ok(tokens)
}

fn is_block_directive(verb: &str) -> bool {
    matches!(
        verb,
        "require" | "exclude" | "replace" | "retract" | "tool" | "ignore" | "godebug"
    )
}

fn check_version(version: &str) -> Result<(), String> {
    if version.len() > 1 && version.starts_with('v') {
        Ok(())
    } else {
        Err(format!("invalid module version {:?}: must start with 'v'", version))
    }
}

fn apply(manifest: &mut Manifest, verb: &str, args: &[String]) -> Result<(), String> {
    match verb {
        "module" => {
            if args.len() != 1 {
                return Err("usage: module module/path".to_string());
            }
            if manifest.module.is_some() {
                return Err("repeated module statement".to_string());
            }
            manifest.module = Some(args[0].clone());
        }
        "go" => {
            let valid = args.len() == 1
                && args[0].split('.').all(|part| {
                    !part.is_empty() && part.chars().next().is_some_and(|c| c.is_ascii_digit())
                });
            if !valid {
                return Err("usage: go 1.23".to_string());
            }
        }
        "toolchain" => {
            if args.len() != 1 {
                return Err("usage: toolchain go1.23.0".to_string());
            }
        }
        "godebug" => {
            if args.len() != 1 || !args[0].contains('=') {
                return Err("usage: godebug key=value".to_string());
            }
        }
        "require" => {
            if args.len() != 2 {
                return Err("usage: require module/path v1.2.3".to_string());
            }
            check_version(&args[1])?;
            manifest.require(ModuleRequirement {
                path: args[0].clone(),
                version: args[1].clone(),
            });
        }
        "exclude" => {
            if args.len() != 2 {
                return Err("usage: exclude module/path v1.2.3".to_string());
            }
            check_version(&args[1])?;
        }
        "replace" => {
            let arrow = args.iter().position(|arg| arg == "=>");
            let valid = match arrow {
                Some(pos) => (1..=2).contains(&pos) && (1..=2).contains(&(args.len() - pos - 1)),
                None => false,
            };
            if !valid {
                return Err(
                    "usage: replace module/path [v1.2.3] => other/module v1.4 or replace module/path [v1.2.3] => ../local/directory"
                        .to_string(),
                );
            }
        }
        "retract" => {
            if args.is_empty() {
                return Err("usage: retract v1.2.3 or retract [v1.2.3, v1.2.4]".to_string());
            }
        }
        "tool" | "ignore" => {
            if args.len() != 1 {
                return Err(format!("usage: {} path", verb));
            }
        }
        other => return Err(format!("unknown directive: {}", other)),
    }
    Ok(())
}

/// Parses the content of a go.mod file; `path` is only used in error messages
pub fn parse(path: &str, content: &str) -> Result<Manifest, ManifestError> {
    let error = |line: usize, message: String| ManifestError {
        path: path.to_string(),
        line,
        message,
    };

    let mut manifest = Manifest::default();
    // Directive and opening line of the block being read
    let mut block: Option<(String, usize)> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let tokens = tokenize(raw).map_err(|message| error(line, message))?;
        if tokens.is_empty() {
            continue;
        }

        if let Some((verb, _)) = &block {
            if tokens == [Token::Close] {
                block = None;
                continue;
            }
            let args = words(&tokens).ok_or_else(|| error(line, "unexpected parenthesis".to_string()))?;
            apply(&mut manifest, verb, &args).map_err(|message| error(line, message))?;
            continue;
        }

        let verb = match &tokens[0] {
            Token::Word(verb) => verb.clone(),
            _ => return Err(error(line, "unexpected parenthesis".to_string())),
        };
        let rest = &tokens[1..];

        if rest == [Token::Open] || rest == [Token::Open, Token::Close] {
            if !is_block_directive(&verb) {
                return Err(error(line, format!("{} cannot be used as a block", verb)));
            }
            if rest.len() == 1 {
                block = Some((verb, line));
            }
            continue;
        }

        let args = words(rest).ok_or_else(|| error(line, "unexpected parenthesis".to_string()))?;
        apply(&mut manifest, &verb, &args).map_err(|message| error(line, message))?;
    }

    if let Some((verb, line)) = block {
        return Err(error(line, format!("unterminated {} block", verb)));
    }

    Ok(manifest)
}

/// Returns the tokens as words, or `None` if any is a parenthesis
fn words(tokens: &[Token]) -> Option<Vec<String>> {
    tokens
        .iter()
        .map(|token| match token {
            Token::Word(word) => Some(word.clone()),
            _ => None,
        })
        .collect()
}
