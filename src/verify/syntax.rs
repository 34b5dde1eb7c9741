//! Typestate declarations as they appear inside Rust macro invocations.
//!
//! This grammar reads token trees rather than text, so it is independent of
//! the specification parser:
//!
//! ```text
//! typestate! {
//!     File<T: Read> {
//!         consume_on_transition = false
//!         states { Closed, Open<T>, Failed }
//!         initial: Closed
//!         terminal: Failed
//!         transitions {
//!             Closed -> (Open<T> | Failed) as OpenResult
//!             Open<T> -> Closed
//!             * -> Failed
//!         }
//!         bridges { Open<T> -> io.Stream.Ready }
//!     }
//! }
//! ```

use crate::core::{base_name, Bridge, GenericParam, Location, State, Transition, TypestateGraph, WILDCARD};
use proc_macro2::{Delimiter, Span, TokenStream, TokenTree};
use quote::ToTokens;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{braced, parenthesized, token, Ident, LitBool, Token, Type};

/// Every block of one macro body.
pub(crate) struct Declarations(pub Vec<TypestateGraph>);

impl Parse for Declarations {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut graphs = Vec::new();
        while !input.is_empty() {
            graphs.push(declaration(input)?);
            skip_separators(input)?;
        }
        Ok(Self(graphs))
    }
}

pub(crate) fn parse_declarations(tokens: TokenStream) -> syn::Result<Vec<TypestateGraph>> {
    syn::parse2::<Declarations>(tokens).map(|d| d.0)
}

fn declaration(input: ParseStream) -> syn::Result<TypestateGraph> {
    if input.peek(Ident) && input.peek2(Ident) {
        let keyword: Ident = input.parse()?;
        if keyword != "typestate" {
            return Err(syn::Error::new(keyword.span(), "expected a typestate name"));
        }
    }

    let name: Ident = input.parse()?;
    let generics: syn::Generics = input.parse()?;
    let content;
    braced!(content in input);

    let mut graph = TypestateGraph::new(name.to_string());
    graph.location = Some(location(name.span()));
    graph.generics = generics.params.iter().filter_map(generic_param).collect();

    while !content.is_empty() {
        let key = content.call(Ident::parse_any)?;
        let section = key.to_string();
        match section.as_str() {
            "strict_transitions" | "sealed" | "consume_on_transition" => {
                content.parse::<Token![=]>()?;
                let value: LitBool = content.parse()?;
                match section.as_str() {
                    "strict_transitions" => graph.flags.strict_transitions = value.value,
                    "sealed" => graph.flags.sealed = value.value,
                    _ => graph.flags.consume_on_transition = value.value,
                }
            }
            "states" => graph
                .states
                .extend(state_list(&content)?.iter().map(|s| State::parse(s))),
            "initial" => graph
                .initial_states
                .extend(state_list(&content)?.iter().map(|s| base_name(s))),
            "terminal" => graph
                .terminal_states
                .extend(state_list(&content)?.iter().map(|s| base_name(s))),
            "transitions" => {
                let body;
                braced!(body in content);
                while !body.is_empty() {
                    graph.transitions.push(transition(&body)?);
                    skip_separators(&body)?;
                }
            }
            "bridges" => {
                let body;
                braced!(body in content);
                while !body.is_empty() {
                    graph.bridges.push(bridge(&body)?);
                    skip_separators(&body)?;
                }
            }
            _ if content.peek(Token![=]) => {
                return Err(syn::Error::new(key.span(), format!("unknown flag `{key}`")));
            }
            _ => {
                return Err(syn::Error::new(key.span(), format!("unknown section `{key}`")));
            }
        }
        skip_separators(&content)?;
    }

    if graph.states.is_empty() {
        return Err(syn::Error::new(
            name.span(),
            format!("typestate `{name}` declares no states"),
        ));
    }
    Ok(graph)
}

fn generic_param(param: &syn::GenericParam) -> Option<GenericParam> {
    match param {
        syn::GenericParam::Type(ty) if ty.bounds.is_empty() => {
            Some(GenericParam::new(ty.ident.to_string()))
        }
        syn::GenericParam::Type(ty) => Some(GenericParam::bounded(
            ty.ident.to_string(),
            render(&ty.bounds),
        )),
        syn::GenericParam::Const(c) => Some(GenericParam::bounded(c.ident.to_string(), render(&c.ty))),
        syn::GenericParam::Lifetime(_) => None,
    }
}

/// `{ A, B }`, `{ A \n B }` or an inline `A, B` list, optionally after `:`.
fn state_list(input: ParseStream) -> syn::Result<Vec<String>> {
    input.parse::<Option<Token![:]>>()?;
    let mut states = Vec::new();
    if input.peek(token::Brace) {
        let body;
        braced!(body in input);
        while !body.is_empty() {
            states.push(render(&state_type(&body)?));
            skip_separators(&body)?;
        }
    } else {
        states.push(render(&state_type(input)?));
        while input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            states.push(render(&state_type(input)?));
        }
    }
    Ok(states)
}

/// A state type: a plain or generic type name, optionally behind `&` or
/// `&mut`. Tuples, arrays, slices and the like name no state.
fn state_type(input: ParseStream) -> syn::Result<Type> {
    let ty: Type = input.parse()?;
    let mut inner = &ty;
    while let Type::Reference(reference) = inner {
        inner = &reference.elem;
    }
    match inner {
        Type::Path(path) if path.qself.is_none() => Ok(ty),
        other => Err(syn::Error::new_spanned(
            other,
            format!("`{}` is not a state type: expected a type name", render(other)),
        )),
    }
}

fn transition(input: ParseStream) -> syn::Result<Transition> {
    let span = input.span();
    let from = if input.peek(Token![*]) && input.peek2(Token![->]) {
        input.parse::<Token![*]>()?;
        None
    } else {
        Some(base_name(&render(&state_type(input)?)))
    };
    input.parse::<Token![->]>()?;
    let to = destinations(input)?;
    let branch = if input.peek(Token![as]) {
        input.parse::<Token![as]>()?;
        Some(input.parse::<Ident>()?)
    } else {
        None
    };

    let source = from.as_deref().unwrap_or(WILDCARD);
    match (&branch, to.len()) {
        (None, n) if n > 1 => {
            return Err(syn::Error::new(
                span,
                format!(
                    "branching transition `{source} -> ({})` needs a result type: add `as Name`",
                    to.join(" | ")
                ),
            ));
        }
        (Some(name), 1) => {
            return Err(syn::Error::new(
                name.span(),
                format!(
                    "`as {name}` is only allowed on branching transitions, `{source} -> {}` has one destination",
                    to[0]
                ),
            ));
        }
        _ => {}
    }

    Ok(Transition {
        is_wildcard: from.is_none(),
        from: source.to_string(),
        to,
        branch_type: branch.map(|b| b.to_string()),
        location: Some(location(span)),
    })
}

fn destinations(input: ParseStream) -> syn::Result<Vec<String>> {
    let types: Vec<Type> = if input.peek(token::Paren) {
        let body;
        let paren = parenthesized!(body in input);
        let types: Vec<Type> = body
            .parse_terminated(state_type, Token![|])?
            .into_iter()
            .collect();
        if types.is_empty() {
            return Err(syn::Error::new(paren.span.join(), "expected a destination state"));
        }
        types
    } else {
        let mut types = vec![state_type(input)?];
        while input.peek(Token![|]) {
            input.parse::<Token![|]>()?;
            types.push(state_type(input)?);
        }
        types
    };
    Ok(types.iter().map(|ty| base_name(&render(ty))).collect())
}

fn bridge(input: ParseStream) -> syn::Result<Bridge> {
    let span = input.span();
    let from = base_name(&render(&state_type(input)?));
    input.parse::<Token![->]>()?;

    let mut segments = vec![input.call(Ident::parse_any)?.to_string()];
    while input.peek(Token![.]) || input.peek(Token![::]) {
        if input.peek(Token![::]) {
            input.parse::<Token![::]>()?;
        } else {
            input.parse::<Token![.]>()?;
        }
        segments.push(input.call(Ident::parse_any)?.to_string());
    }

    let (Some(to_state), Some(to_graph)) = (segments.pop(), segments.pop()) else {
        return Err(syn::Error::new(
            span,
            "bridge destination must be written `Typestate.State`",
        ));
    };
    let bridge = Bridge::new(from, to_graph, to_state).at(location(span));
    Ok(if segments.is_empty() {
        bridge
    } else {
        bridge.with_module(segments.join("."))
    })
}

fn skip_separators(input: ParseStream) -> syn::Result<()> {
    while input.peek(Token![,]) || input.peek(Token![;]) {
        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
        } else {
            input.parse::<Token![;]>()?;
        }
    }
    Ok(())
}

pub(crate) fn location(span: Span) -> Location {
    let start = span.start();
    Location::new(start.line, start.column + 1)
}

/// Compact source text of `tokens`: `&mut Open<T>` rather than the spaced
/// `& mut Open < T >` a `TokenStream` prints.
pub(crate) fn render(tokens: &impl ToTokens) -> String {
    render_as(tokens, None)
}

/// Like [`render`], with `Self` replaced by `self_ty`.
pub(crate) fn render_as(tokens: &impl ToTokens, self_ty: Option<&str>) -> String {
    let mut out = String::new();
    write_tokens(tokens.to_token_stream(), self_ty, &mut out);
    out
}

fn write_tokens(stream: TokenStream, self_ty: Option<&str>, out: &mut String) {
    let mut word = false;
    for tree in stream {
        match tree {
            TokenTree::Ident(ident) => {
                if word {
                    out.push(' ');
                }
                match self_ty {
                    Some(ty) if ident == "Self" => out.push_str(ty),
                    _ => out.push_str(&ident.to_string()),
                }
                word = true;
            }
            TokenTree::Literal(literal) => {
                if word {
                    out.push(' ');
                }
                out.push_str(&literal.to_string());
                word = true;
            }
            TokenTree::Punct(punct) => {
                out.push(punct.as_char());
                if punct.as_char() == ',' {
                    out.push(' ');
                }
                word = false;
            }
            TokenTree::Group(group) => {
                let (open, close) = match group.delimiter() {
                    Delimiter::Parenthesis => ("(", ")"),
                    Delimiter::Bracket => ("[", "]"),
                    Delimiter::Brace => ("{", "}"),
                    Delimiter::None => ("", ""),
                };
                out.push_str(open);
                write_tokens(group.stream(), self_ty, out);
                out.push_str(close);
                word = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    fn parse(tokens: TokenStream) -> syn::Result<Vec<TypestateGraph>> {
        parse_declarations(tokens)
    }

    #[test]
    fn juxtaposed_and_comma_separated_lists_agree() {
        let inline = parse(quote!(File { states { Closed, Open } })).unwrap();
        let lines = parse(quote!(File { states { Closed Open } })).unwrap();
        assert_eq!(
            inline[0].state_names().collect::<Vec<_>>(),
            lines[0].state_names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn branching_with_and_without_parens() {
        let graphs = parse(quote!(
            File {
                states { Closed, Open, Failed, Locked }
                transitions {
                    Closed -> (Open | Failed) as OpenResult
                    Open -> Locked | Failed as LockResult
                }
            }
        ))
        .unwrap();
        let transitions = &graphs[0].transitions;
        assert_eq!(transitions[0].to, vec!["Open", "Failed"]);
        assert_eq!(transitions[0].branch_type.as_deref(), Some("OpenResult"));
        assert_eq!(transitions[1].to, vec!["Locked", "Failed"]);
    }

    #[test]
    fn branch_name_rules_are_enforced() {
        let missing = parse(quote!(F { states { A, B, C } transitions { A -> (B | C) } }));
        assert!(missing.unwrap_err().to_string().contains("needs a result type"));

        let extra = parse(quote!(F { states { A, B } transitions { A -> B as Named } }));
        assert!(extra
            .unwrap_err()
            .to_string()
            .contains("only allowed on branching"));
    }

    #[test]
    fn wildcard_applies_to_the_whole_arrow() {
        let graphs = parse(quote!(F { states { A, Failed } transitions { * -> Failed } })).unwrap();
        let wildcard = &graphs[0].transitions[0];
        assert!(wildcard.is_wildcard);
        assert_eq!(wildcard.from, WILDCARD);
        assert!(graphs[0].has_transition("A", "Failed"));
    }

    #[test]
    fn bridge_qualifiers_are_kept_as_text() {
        let graphs = parse(quote!(
            Auth {
                states { Granted }
                bridges {
                    Granted -> Session.Active
                    Granted -> net::io.Session.Idle
                }
            }
        ))
        .unwrap();
        let bridges = &graphs[0].bridges;
        assert_eq!(bridges[0].module, None);
        assert_eq!(bridges[1].module.as_deref(), Some("net.io"));
        assert_eq!(bridges[1].qualified_destination(), "net.io.Session.Idle");

        let bare = parse(quote!(Auth { states { Granted } bridges { Granted -> Session } }));
        assert!(bare.is_err());
    }

    #[test]
    fn flags_generics_and_markers() {
        let graphs = parse(quote!(
            typestate Container<T: Clone + Send, U> {
                sealed = false
                strict_transitions = false;
                states { Empty<T>, Full<T, U> }
                initial: Empty<T>
                terminal: Full<T, U>
                transitions { Empty<T> -> Full<T, U> }
            }
        ))
        .unwrap();
        let graph = &graphs[0];
        assert!(!graph.flags.sealed);
        assert!(!graph.flags.strict_transitions);
        assert!(graph.flags.consume_on_transition);
        assert_eq!(graph.generics[0], GenericParam::bounded("T", "Clone+Send"));
        assert_eq!(graph.generics[1], GenericParam::new("U"));
        assert_eq!(graph.states[1].repr, "Full<T, U>");
        assert_eq!(graph.initial_states, vec!["Empty"]);
        assert!(graph.has_transition("Empty<i32>", "Full"));
    }

    #[test]
    fn unknown_sections_and_flags_are_rejected() {
        let section = parse(quote!(F { states { A } events { A } }));
        assert!(section.unwrap_err().to_string().contains("unknown section `events`"));
        let flag = parse(quote!(F { states { A } frozen = true }));
        assert!(flag.unwrap_err().to_string().contains("unknown flag `frozen`"));
        let empty = parse(quote!(F { sealed = true }));
        assert!(empty.unwrap_err().to_string().contains("declares no states"));
    }

    #[test]
    fn only_named_types_can_be_states() {
        for tokens in [
            quote!(Pair { states { (A, B), C } }),
            quote!(Pair { states { [A; 2], C } }),
            quote!(Pair { states { &(A, B) } }),
            quote!(Pair { states { A, C } transitions { A -> &(A, C) } }),
        ] {
            let err = parse(tokens).unwrap_err();
            assert!(err.to_string().contains("is not a state type"), "{err}");
        }

        let graphs = parse(quote!(Pair { states { &mut A, fs::B<T> } })).unwrap();
        assert_eq!(graphs[0].state_names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn several_blocks_in_one_body() {
        let graphs = parse(quote!(A { states { X } } B { states { Y } })).unwrap();
        assert_eq!(graphs.len(), 2);
        assert_eq!(graphs[1].name, "B");
    }

    #[test]
    fn render_is_compact() {
        let ty: Type = syn::parse_quote!(&'a mut crate::fs::Open<Vec<u8>, T>);
        assert_eq!(render(&ty), "&'a mut crate::fs::Open<Vec<u8>, T>");
        let ty: Type = syn::parse_quote!(&mut Self);
        assert_eq!(render_as(&ty, Some("Open<T>")), "&mut Open<T>");
    }
}
