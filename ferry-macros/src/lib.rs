mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Runs an `async fn main` on a fresh ferry worker.
///
/// The body is submitted to a new worker and the main thread blocks on
/// its outcome; the worker is stopped before `main` returns. The
/// function may take one `Scheduler` parameter, bound to that worker.
///
/// ```rust,ignore
/// #[ferry::main(name = "app")]
/// async fn main(scheduler: ferry::Scheduler) {
///     scheduler.sleep(Duration::from_millis(10)).await;
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, "\"ferry-main\"", false)
}

/// Runs an `async fn` test on a fresh ferry worker.
///
/// A panic inside the body fails the test with the original message.
///
/// ```rust,ignore
/// #[ferry::test]
/// async fn sleeps(scheduler: ferry::Scheduler) {
///     scheduler.sleep(Duration::from_millis(5)).await;
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, "\"ferry-test\"", true)
}

fn expand(attr: TokenStream, item: TokenStream, default_name: &str, is_test: bool) -> TokenStream {
    let options = match utils::parse_options(attr) {
        Ok(options) => options,
        Err(msg) => return compile_error(&msg),
    };

    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    else {
        return compile_error("the function must be declared `async`");
    };
    tokens.remove(async_pos);

    let binding = utils::take_scheduler_param(&mut tokens);

    let Some(pos) = tokens.iter().rposition(
        |t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace),
    ) else {
        return compile_error("expected a function body");
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let mut builder = String::from("::ferry::WorkerBuilder::new()");
    builder.push_str(&format!(
        ".name({})",
        options.name.as_deref().unwrap_or(default_name)
    ));
    if let Some(bytes) = &options.stack_size {
        builder.push_str(&format!(".stack_size({bytes})"));
    }
    builder.push_str(".start()");

    let bind = binding
        .map(|pattern| format!("let {pattern} = __ferry_scheduler.clone();"))
        .unwrap_or_default();

    let new_block = format!(
        "{{
            let __ferry_scheduler = {builder}.expect(\"failed to start the ferry worker\");
            {bind}
            let __ferry_handle = __ferry_scheduler
                .submit(async move {{
                    ::core::result::Result::Ok::<_, ::core::convert::Infallible>(
                        async move {{ {block} }}.await,
                    )
                }})
                .expect(\"failed to submit to the ferry worker\");
            let __ferry_outcome = __ferry_handle.wait();
            __ferry_scheduler.stop();
            match __ferry_outcome {{
                ::core::result::Result::Ok(value) => value,
                ::core::result::Result::Err(err) => ::core::panic!(\"{{}}\", err),
            }}
        }}"
    );

    let body = match new_block.parse() {
        Ok(body) => body,
        Err(err) => return compile_error(&format!("ferry macro error: {err}")),
    };
    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, body));

    let mut result: Vec<TokenTree> = Vec::new();
    if is_test {
        result.extend("#[test]".parse::<TokenStream>().unwrap_or_default());
    }
    result.extend(tokens);

    result.into_iter().collect()
}

fn compile_error(msg: &str) -> TokenStream {
    format!("::core::compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}
