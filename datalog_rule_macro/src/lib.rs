extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::parse::{Parse, ParseStream};
use syn::{bracketed, parenthesized, Expr, Ident, Result, Token};

enum TermArg {
    Variable(Ident),
    Constant(Expr),
}

struct AtomArgs {
    name: Ident,
    args: Vec<TermArg>,
}

struct RuleMacroInput {
    head: AtomArgs,
    body: Vec<AtomArgs>,
}

impl Parse for TermArg {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(Token![?]) {
            input.parse::<Token![?]>()?;
            let ident: Ident = input.parse()?;
            Ok(TermArg::Variable(ident))
        } else {
            let expr: Expr = input.parse()?;
            Ok(TermArg::Constant(expr))
        }
    }
}

impl Parse for RuleMacroInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let head = input.parse::<AtomArgs>()?;
        let mut distinguished_variables: HashMap<String, (&Ident, bool)> = head
            .args
            .iter()
            .filter(|term| matches!(term, TermArg::Variable(_)))
            .map(|variable| match variable {
                TermArg::Variable(ident) => (ident.to_string(), (ident, false)),
                _ => unreachable!(),
            })
            .collect();

        input.parse::<Token![<-]>()?;
        let content;
        bracketed!(content in input);
        let body: syn::punctuated::Punctuated<AtomArgs, Token![,]> =
            content.parse_terminated(AtomArgs::parse)?;
        let body_vec: Vec<AtomArgs> = body.into_iter().collect();
        body_vec.iter().for_each(|body_atom| {
            body_atom
                .args
                .iter()
                .filter(|term| matches!(term, TermArg::Variable(_)))
                .for_each(|variable| match variable {
                    TermArg::Variable(ident) => {
                        let owned_ident = ident.to_string();

                        if distinguished_variables.contains_key(&owned_ident) {
                            distinguished_variables.get_mut(&owned_ident).unwrap().1 = true;
                        }
                    }
                    _ => unreachable!(),
                });
        });

        // Range restriction: every head variable has to be bound in the body.
        for (key, value) in distinguished_variables {
            if !value.1 {
                return Err(syn::Error::new(
                    value.0.span(),
                    format!("variable {} not found in the body", key),
                ));
            }
        }

        Ok(RuleMacroInput {
            head,
            body: body_vec,
        })
    }
}

impl Parse for AtomArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let name: Ident = input.parse()?;
        let content;
        parenthesized!(content in input);
        let args = content
            .parse_terminated::<TermArg, Token![,]>(TermArg::parse)?
            .into_iter()
            .collect();

        Ok(AtomArgs { name, args })
    }
}

fn quote_atom(atom: &AtomArgs) -> proc_macro2::TokenStream {
    let name = &atom.name;
    let terms: Vec<_> = atom
        .args
        .iter()
        .map(|arg| match arg {
            TermArg::Variable(ident) => {
                quote! { Term::Variable(stringify!(#ident).to_string()) }
            }
            TermArg::Constant(expr) => quote! { Term::Constant(TypedValue::from(#expr)) },
        })
        .collect();

    quote! { Atom { terms: vec![#(#terms),*], symbol: stringify!(#name).to_string() } }
}

fn quote_rule(rule_input: &RuleMacroInput) -> proc_macro2::TokenStream {
    let head = quote_atom(&rule_input.head);
    let body_atoms: Vec<_> = rule_input.body.iter().map(quote_atom).collect();

    quote! {
        Rule {
            head: #head,
            body: vec![#(#body_atoms),*],
            id: 0
        }
    }
}

#[proc_macro]
pub fn rule(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as RuleMacroInput);

    quote_rule(&input).into()
}

struct ProgramMacroInput {
    rules: syn::punctuated::Punctuated<RuleMacroInput, Token![,]>,
}

impl Parse for ProgramMacroInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let rules = input.parse_terminated(RuleMacroInput::parse)?;
        Ok(ProgramMacroInput { rules })
    }
}

#[proc_macro]
pub fn program(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as ProgramMacroInput);

    let rules: Vec<_> = input.rules.iter().map(quote_rule).collect();

    let expanded = quote! {
        Program::from( vec![#(#rules),*] )
    };

    expanded.into()
}
