//! Procedural macros for `rpcgate`.
//!
//! `#[service]` is placed on an inherent `impl` block. It walks every method of
//! the block, checks it against the dispatch calling convention and implements
//! `rpcgate::Service` for the block's self type: one adapter per admitted method,
//! one `Exclusion` (with a reason) per rejected one.
//!
//! ```rust,ignore
//! use rpcgate::service;
//!
//! pub struct Math;
//!
//! #[service]
//! impl Math {
//!     pub fn add(&self, input: AddInput) -> Result<i64, MathError> { /* ... */ }
//!
//!     #[rpc(rename = "subtract")]
//!     pub fn sub(&self, input: &AddInput) -> anyhow::Result<i64> { /* ... */ }
//!
//!     #[rpc(skip)]
//!     pub fn helper(&self) -> Result<(), MathError> { Ok(()) }
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, FnArg, GenericArgument, GenericParam, ImplItem, ImplItemFn, ItemImpl,
    LitStr, PathArguments, ReturnType, Type, Visibility,
};

/// Output arity of an admitted method.
#[derive(Clone, Copy)]
enum Outputs {
    None,
    ErrorOnly,
    ValueAndError,
}

impl Outputs {
    fn variant(self) -> TokenStream2 {
        match self {
            Outputs::None => quote!(::rpcgate::Outputs::None),
            Outputs::ErrorOnly => quote!(::rpcgate::Outputs::ErrorOnly),
            Outputs::ValueAndError => quote!(::rpcgate::Outputs::ValueAndError),
        }
    }
}

/// How the decoded input is handed to the method.
enum Passing {
    Value,
    Ref,
    RefMut,
}

struct Input {
    decoded: Type,
    passing: Passing,
}

#[derive(Default)]
struct RpcAttr {
    skip: bool,
    rename: Option<String>,
}

/// Pull `#[rpc(...)]` helper attributes off a method.
fn take_rpc_attr(method: &mut ImplItemFn) -> syn::Result<RpcAttr> {
    let mut parsed = RpcAttr::default();
    for attr in method.attrs.iter().filter(|a| a.path().is_ident("rpc")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                parsed.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.rename = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `rename = \"...\"`"))
            }
        })?;
    }
    method.attrs.retain(|a| !a.path().is_ident("rpc"));
    Ok(parsed)
}

fn contains_impl_trait(ty: &Type) -> bool {
    match ty {
        Type::ImplTrait(_) => true,
        Type::Reference(r) => contains_impl_trait(&r.elem),
        Type::Paren(p) => contains_impl_trait(&p.elem),
        Type::Group(g) => contains_impl_trait(&g.elem),
        _ => false,
    }
}

/// Borrowed unsized inputs are decoded into their owned counterpart.
fn owned_counterpart(ty: &Type) -> Type {
    match ty {
        Type::Path(p) if p.qself.is_none() && p.path.is_ident("str") => {
            syn::parse_quote!(::std::string::String)
        }
        Type::Slice(s) => {
            let elem = &s.elem;
            syn::parse_quote!(::std::vec::Vec<#elem>)
        }
        other => other.clone(),
    }
}

fn classify_input(ty: &Type) -> Result<Input, &'static str> {
    if contains_impl_trait(ty) {
        return Err("input uses `impl Trait` and has no concrete shape");
    }
    Ok(match ty {
        Type::Reference(r) => Input {
            decoded: owned_counterpart(&r.elem),
            passing: if r.mutability.is_some() {
                Passing::RefMut
            } else {
                Passing::Ref
            },
        },
        other => Input {
            decoded: other.clone(),
            passing: Passing::Value,
        },
    })
}

fn classify_output(ret: &ReturnType) -> Result<Outputs, &'static str> {
    const NOT_ERROR_LIKE: &str = "returns a single value that cannot carry an error";
    let ty = match ret {
        ReturnType::Default => return Ok(Outputs::None),
        ReturnType::Type(_, ty) => ty.as_ref(),
    };
    match ty {
        Type::Tuple(t) if t.elems.is_empty() => Ok(Outputs::None),
        Type::Path(p) if p.qself.is_none() => {
            let Some(last) = p.path.segments.last() else {
                return Err(NOT_ERROR_LIKE);
            };
            if last.ident != "Result" {
                return Err(NOT_ERROR_LIKE);
            }
            match &last.arguments {
                PathArguments::AngleBracketed(args) => match args.args.first() {
                    Some(GenericArgument::Type(Type::Tuple(t))) if t.elems.is_empty() => {
                        Ok(Outputs::ErrorOnly)
                    }
                    _ => Ok(Outputs::ValueAndError),
                },
                _ => Ok(Outputs::ValueAndError),
            }
        }
        _ => Err(NOT_ERROR_LIKE),
    }
}

/// Check a method against the calling convention.
fn admit(method: &ImplItemFn) -> Result<(Option<Input>, Outputs), &'static str> {
    let sig = &method.sig;
    if !matches!(method.vis, Visibility::Public(_)) {
        return Err("not public");
    }
    if sig.asyncness.is_some() {
        return Err("async methods are not dispatchable");
    }
    if sig.unsafety.is_some() {
        return Err("unsafe methods are not dispatchable");
    }
    if sig.variadic.is_some() {
        return Err("variadic methods are not dispatchable");
    }
    if sig
        .generics
        .params
        .iter()
        .any(|p| !matches!(p, GenericParam::Lifetime(_)))
    {
        return Err("generic methods have no concrete input shape");
    }
    match sig.receiver() {
        Some(r) if r.reference.is_some() && r.mutability.is_none() && r.colon_token.is_none() => {}
        Some(_) => return Err("receiver must be `&self`"),
        None => return Err("associated function without a `&self` receiver"),
    }

    let typed: Vec<_> = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pt) => Some(pt),
            FnArg::Receiver(_) => None,
        })
        .collect();
    let input = match typed.as_slice() {
        [] => None,
        [only] => Some(classify_input(&only.ty)?),
        _ => return Err("takes more than one input argument"),
    };

    let outputs = classify_output(&sig.output)?;
    Ok((input, outputs))
}

fn adapter(method: &ImplItemFn, name: &str, input: Option<Input>, outputs: Outputs) -> TokenStream2 {
    let ident = &method.sig.ident;
    let arity = outputs.variant();

    let (shape, decode, call) = match input {
        Some(Input { decoded, passing }) => {
            let (binding, arg) = match passing {
                Passing::Value => (quote!(input), quote!(input)),
                Passing::Ref => (quote!(input), quote!(&input)),
                Passing::RefMut => (quote!(mut input), quote!(&mut input)),
            };
            (
                quote!(::std::option::Option::Some(::rpcgate::InputShape::of::<#decoded>())),
                quote! {
                    let #binding: #decoded = ::rpcgate::__private::decode_input(input)?;
                },
                quote!(service.#ident(#arg)),
            )
        }
        None => (
            quote!(::std::option::Option::None),
            quote!(let _ = input;),
            quote!(service.#ident()),
        ),
    };

    let classify = match outputs {
        Outputs::None => quote! {
            #call;
            ::std::result::Result::Ok(::rpcgate::Outcome::Empty)
        },
        Outputs::ErrorOnly => quote! {
            #[allow(unused_imports)]
            use ::rpcgate::__private::{ErrorDisplayKind as _, ErrorResponderKind as _};
            ::std::result::Result::Ok(match #call {
                ::std::result::Result::Ok(()) => ::rpcgate::Outcome::Empty,
                ::std::result::Result::Err(error) => (&error).rpcgate_error_kind().failure(&error),
            })
        },
        Outputs::ValueAndError => quote! {
            #[allow(unused_imports)]
            use ::rpcgate::__private::{
                ErrorDisplayKind as _, ErrorResponderKind as _, ValueResponderKind as _,
                ValueSerializeKind as _,
            };
            ::std::result::Result::Ok(match #call {
                ::std::result::Result::Ok(value) => (&value).rpcgate_value_kind().success(&value),
                ::std::result::Result::Err(error) => (&error).rpcgate_error_kind().failure(&error),
            })
        },
    };

    quote! {
        ::rpcgate::MethodDef::new(
            #name,
            #shape,
            #arity,
            |service: &Self, input: ::std::option::Option<::rpcgate::__private::Value>| {
                #decode
                #classify
            },
        )
    }
}

/// Implement `rpcgate::Service` for the self type of an inherent `impl` block.
///
/// Admitted methods are `pub`, take `&self`, take at most one deserializable
/// input (by value or by reference) and return nothing, `Result<(), E>` or
/// `Result<T, E>`. Everything else is recorded as an exclusion.
#[proc_macro_attribute]
pub fn service(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        let attr = TokenStream2::from(attr);
        return syn::Error::new_spanned(attr, "#[service] takes no arguments")
            .to_compile_error()
            .into();
    }
    let mut item_impl = parse_macro_input!(item as ItemImpl);
    if let Some((_, path, _)) = &item_impl.trait_ {
        return syn::Error::new_spanned(path, "#[service] belongs on an inherent impl block")
            .to_compile_error()
            .into();
    }

    let mut defs = Vec::new();
    let mut exclusions = Vec::new();
    let mut errors: Option<syn::Error> = None;

    for item in item_impl.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let rpc = match take_rpc_attr(method) {
            Ok(rpc) => rpc,
            Err(e) => {
                match errors.as_mut() {
                    Some(all) => all.combine(e),
                    None => errors = Some(e),
                }
                continue;
            }
        };
        let name = rpc
            .rename
            .unwrap_or_else(|| method.sig.ident.unraw().to_string());

        if rpc.skip {
            exclusions.push(quote!(::rpcgate::Exclusion::new(#name, "marked #[rpc(skip)]")));
            continue;
        }
        match admit(method) {
            Ok((input, outputs)) => defs.push(adapter(method, &name, input, outputs)),
            Err(reason) => {
                exclusions.push(quote!(::rpcgate::Exclusion::new(#name, #reason)));
            }
        }
    }

    if let Some(errors) = errors {
        return errors.to_compile_error().into();
    }

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    let mut expanded = item_impl.to_token_stream();
    expanded.extend(quote! {
        impl #impl_generics ::rpcgate::Service for #self_ty #where_clause {
            fn methods() -> ::std::vec::Vec<::rpcgate::MethodDef<Self>> {
                ::std::vec![#(#defs),*]
            }

            fn exclusions() -> ::std::vec::Vec<::rpcgate::Exclusion> {
                ::std::vec![#(#exclusions),*]
            }
        }
    });
    TokenStream::from(expanded)
}
