//! Helper-type generator.
//!
//! For a finished graph, emits:
//!
//! - `enum <Name>State`, one unit variant per state, with `name()`,
//!   `is_initial()`, `is_terminal()` and `ALL`;
//! - `trait <Name>States`, implemented by every state type with an associated
//!   `STATE` constant;
//! - one enum per branch result type, with a `From` impl for each member so
//!   an operation can return `state.into()`.

mod error;

pub use error::CodegenError;

use crate::core::{GenericParam, TypestateGraph};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote, ToTokens};
use syn::Type;

/// Generate the helper items for `graph`.
///
/// ```rust
/// use typestates::codegen::generate;
/// use typestates::spec::parse_typestate;
///
/// let graph = parse_typestate(
///     "File { states { Closed, Open, Failed } transitions { Closed -> Open | Failed as OpenResult } }",
/// )
/// .unwrap();
/// let code = generate(&graph).unwrap().to_string();
/// assert!(code.contains("pub enum FileState"));
/// assert!(code.contains("pub enum OpenResult"));
/// ```
pub fn generate(graph: &TypestateGraph) -> Result<TokenStream, CodegenError> {
    let state_enum = state_enum(graph)?;
    let state_trait = state_trait(graph)?;
    let branches = branch_enums(graph)?;
    Ok(quote! {
        #state_enum
        #state_trait
        #(#branches)*
    })
}

/// Generate helper items for every graph, in order.
pub fn generate_all<'a>(
    graphs: impl IntoIterator<Item = &'a TypestateGraph>,
) -> Result<TokenStream, CodegenError> {
    let mut out = TokenStream::new();
    for graph in graphs {
        out.extend(generate(graph)?);
    }
    Ok(out)
}

fn state_enum(graph: &TypestateGraph) -> Result<TokenStream, CodegenError> {
    let name = format_ident!("{}State", ident(graph, &graph.name)?);
    let variants = graph
        .state_names()
        .map(|s| ident(graph, s))
        .collect::<Result<Vec<_>, _>>()?;
    let labels: Vec<&str> = graph.state_names().collect();
    let initial = matcher(graph, &graph.initial_states)?;
    let terminal = matcher(graph, &graph.terminal_states)?;

    Ok(quote! {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum #name {
            #(#variants,)*
        }

        impl #name {
            pub const ALL: &'static [#name] = &[#(#name::#variants),*];

            pub fn name(self) -> &'static str {
                match self {
                    #(Self::#variants => #labels,)*
                }
            }

            pub fn is_initial(self) -> bool {
                #initial
            }

            pub fn is_terminal(self) -> bool {
                #terminal
            }
        }
    })
}

fn matcher(graph: &TypestateGraph, states: &[String]) -> Result<TokenStream, CodegenError> {
    let variants = states
        .iter()
        .filter(|s| graph.has_state(s))
        .map(|s| ident(graph, s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if variants.is_empty() {
        quote!(false)
    } else {
        quote!(matches!(self, #(Self::#variants)|*))
    })
}

fn state_trait(graph: &TypestateGraph) -> Result<TokenStream, CodegenError> {
    let name = ident(graph, &graph.name)?;
    let trait_name = format_ident!("{}States", name);
    let enum_name = format_ident!("{}State", name);

    let mut impls = Vec::with_capacity(graph.states.len());
    for state in &graph.states {
        let ty = parse_type(graph, &state.repr)?;
        let generics = angled(&generics_for(graph, &state.args)?);
        let variant = ident(graph, &state.name)?;
        impls.push(quote! {
            impl #generics #trait_name for #ty {
                const STATE: #enum_name = #enum_name::#variant;
            }
        });
    }

    Ok(quote! {
        pub trait #trait_name {
            const STATE: #enum_name;
        }

        #(#impls)*
    })
}

fn branch_enums(graph: &TypestateGraph) -> Result<Vec<TokenStream>, CodegenError> {
    let mut seen: Vec<&str> = Vec::new();
    let mut out = Vec::new();
    for transition in &graph.transitions {
        let Some(branch) = transition.branch_type.as_deref() else {
            continue;
        };
        if seen.contains(&branch) {
            continue;
        }
        seen.push(branch);

        let name = ident(graph, branch)?;
        let mut args = Vec::new();
        let mut variants = Vec::new();
        let mut types = Vec::new();
        for member in &transition.to {
            let repr = graph.state(member).map_or(member.as_str(), |s| s.repr.as_str());
            if let Some(state) = graph.state(member) {
                args.extend(state.args.iter().cloned());
            }
            variants.push(ident(graph, member)?);
            types.push(parse_type(graph, repr)?);
        }
        let generics = angled(&generics_for(graph, &args)?);
        let names = graph
            .generics
            .iter()
            .filter(|g| uses(&args, &g.name))
            .map(|g| ident(graph, &g.name))
            .collect::<Result<Vec<_>, _>>()?;
        let names = angled(&names);

        out.push(quote! {
            pub enum #name #generics {
                #(#variants(#types),)*
            }

            #(
                impl #generics From<#types> for #name #names {
                    fn from(state: #types) -> Self {
                        Self::#variants(state)
                    }
                }
            )*
        });
    }
    Ok(out)
}

/// Generic parameters of `graph` that occur in `args`, with their bounds.
fn generics_for(
    graph: &TypestateGraph,
    args: &[String],
) -> Result<Vec<syn::GenericParam>, CodegenError> {
    graph
        .generics
        .iter()
        .filter(|g| uses(args, &g.name))
        .map(|g| parse_generic(graph, g))
        .collect()
}

/// `<a, b>`, or nothing for an empty list.
fn angled<T: ToTokens>(items: &[T]) -> TokenStream {
    if items.is_empty() {
        TokenStream::new()
    } else {
        quote!(<#(#items),*>)
    }
}

fn uses(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| {
        arg.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .any(|word| word == name)
    })
}

fn parse_generic(
    graph: &TypestateGraph,
    param: &GenericParam,
) -> Result<syn::GenericParam, CodegenError> {
    let text = match &param.constraint {
        Some(bound) => format!("{}: {}", param.name, bound),
        None => param.name.clone(),
    };
    syn::parse_str(&text).map_err(|e| invalid(graph, "generic parameter", &text, &e))
}

/// `text` as an identifier, rejecting anything `format_ident!` would panic on.
fn ident(graph: &TypestateGraph, text: &str) -> Result<Ident, CodegenError> {
    syn::parse_str(text).map_err(|e| invalid(graph, "identifier", text, &e))
}

fn parse_type(graph: &TypestateGraph, repr: &str) -> Result<Type, CodegenError> {
    syn::parse_str(repr).map_err(|e| invalid(graph, "type", repr, &e))
}

fn invalid(
    graph: &TypestateGraph,
    what: &'static str,
    text: &str,
    err: &syn::Error,
) -> CodegenError {
    CodegenError::InvalidSyntax {
        typestate: graph.name.clone(),
        what,
        text: text.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse_typestate;

    fn generated(source: &str) -> syn::File {
        let graph = parse_typestate(source).unwrap();
        syn::parse2(generate(&graph).unwrap()).unwrap()
    }

    fn item_names(file: &syn::File) -> Vec<String> {
        file.items
            .iter()
            .filter_map(|item| match item {
                syn::Item::Enum(e) => Some(e.ident.to_string()),
                syn::Item::Trait(t) => Some(t.ident.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn emits_state_enum_trait_and_branch_enum() {
        let file = generated(
            "File {
                states { Closed, Open, Failed }
                terminal: Failed
                transitions {
                    Closed -> (Open | Failed) as OpenResult
                    Open -> Closed
                }
            }",
        );
        assert_eq!(item_names(&file), vec!["FileState", "FileStates", "OpenResult"]);

        let from_impls = file
            .items
            .iter()
            .filter_map(|item| match item {
                syn::Item::Impl(i) => i.trait_.as_ref(),
                _ => None,
            })
            .filter(|(_, path, _)| path.segments.last().is_some_and(|s| s.ident == "From"))
            .count();
        assert_eq!(from_impls, 2);
    }

    #[test]
    fn state_queries_follow_markers() {
        let graph = parse_typestate(
            "Job {
                states { New, Running, Done }
                initial: New
                terminal: Done
                transitions {
                    New -> Running
                    Running -> Done
                }
            }",
        )
        .unwrap();
        let code = generate(&graph).unwrap().to_string();
        assert!(code.contains("matches ! (self , Self :: New)"));
        assert!(code.contains("matches ! (self , Self :: Done)"));
        assert!(code.contains("\"Running\""));
    }

    #[test]
    fn no_markers_means_false() {
        let code = generate(&parse_typestate("Flag { states { On, Off } }").unwrap())
            .unwrap()
            .to_string();
        assert_eq!(code.matches("false").count(), 2);
    }

    #[test]
    fn generic_states_carry_their_bounds() {
        let file = generated(
            "Container<T: Clone> {
                states { Empty<T>, Full<T>, Sealed }
                transitions { Empty<T> -> Full<T> | Sealed as Filled }
            }",
        );
        let code = quote!(#file).to_string();
        assert!(code.contains("impl < T : Clone > ContainerStates for Empty < T >"));
        assert!(code.contains("impl ContainerStates for Sealed"));
        assert!(code.contains("pub enum Filled < T : Clone >"));
        assert!(code.contains("From < Sealed > for Filled < T >"));
    }

    #[test]
    fn non_identifier_state_names_are_reported() {
        let graph = TypestateGraph::new("Pair").with_states(["(A, B)", "C"]);
        assert!(matches!(
            generate_all([&graph]),
            Err(CodegenError::InvalidSyntax { what: "identifier", ref text, .. }) if text == "(A, B)"
        ));

        let keyword = TypestateGraph::new("Flow").with_states(["Start"]).with_transition(
            crate::core::Transition::branching("Start", ["Start"], "match"),
        );
        assert!(matches!(
            generate(&keyword),
            Err(CodegenError::InvalidSyntax { what: "identifier", .. })
        ));
    }

    #[test]
    fn invalid_type_is_reported() {
        let mut graph = parse_typestate("Odd { states { A } }").unwrap();
        graph.states[0].repr = "A<".into();
        assert!(matches!(
            generate(&graph),
            Err(CodegenError::InvalidSyntax { what: "type", .. })
        ));
    }
}
