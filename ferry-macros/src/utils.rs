use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Options accepted by `#[ferry::main(...)]` and `#[ferry::test(...)]`.
#[derive(Default)]
pub(crate) struct Options {
    /// Worker thread name, as a string literal.
    pub(crate) name: Option<String>,

    /// Worker stack size, as an integer literal.
    pub(crate) stack_size: Option<String>,
}

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`. Only top-level
/// commas separate arguments; groups are kept whole.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens into a Rust source string.
///
/// A space is inserted between consecutive identifiers so that
/// `mut scheduler` does not become `mutscheduler`.
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    let mut out = String::new();
    let mut prev_was_ident = false;

    for t in tokens {
        let is_ident = matches!(t, TokenTree::Ident(_));

        if prev_was_ident && is_ident {
            out.push(' ');
        }

        out.push_str(&t.to_string());
        prev_was_ident = is_ident;
    }

    out
}

/// Parses `key = literal` pairs from an attribute argument list.
///
/// Recognised keys are `name` and `stack_size`.
pub(crate) fn parse_options(attr: TokenStream) -> Result<Options, String> {
    let mut options = Options::default();

    for arg in split_args(attr) {
        let [TokenTree::Ident(key), TokenTree::Punct(eq), TokenTree::Literal(value)] = arg.as_slice()
        else {
            return Err(format!(
                "expected `key = value`, found `{}`",
                tokens_to_string(&arg)
            ));
        };

        if eq.as_char() != '=' {
            return Err(format!("expected `=` after `{key}`"));
        }

        match key.to_string().as_str() {
            "name" => options.name = Some(value.to_string()),
            "stack_size" => options.stack_size = Some(value.to_string()),
            other => return Err(format!("unknown option `{other}`")),
        }
    }

    Ok(options)
}

/// Removes the single `name: Scheduler` parameter of the annotated
/// function, if there is one, and returns its binding pattern.
///
/// The generated body rebinds that pattern to the worker's scheduler.
pub(crate) fn take_scheduler_param(tokens: &mut [TokenTree]) -> Option<String> {
    let fn_pos = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "fn"))?;

    let params_pos = fn_pos
        + tokens[fn_pos..].iter().position(
            |t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Parenthesis),
        )?;

    let TokenTree::Group(group) = &tokens[params_pos] else {
        return None;
    };

    let params: Vec<TokenTree> = group.stream().into_iter().collect();
    let colon = params
        .iter()
        .position(|t| matches!(t, TokenTree::Punct(p) if p.as_char() == ':'))?;

    let pattern = tokens_to_string(&params[..colon]);

    let mut empty = Group::new(Delimiter::Parenthesis, TokenStream::new());
    empty.set_span(group.span());
    tokens[params_pos] = TokenTree::Group(empty);

    Some(pattern)
}
