//! Macros for keel-di. `#[derive(Injectable)]` injects struct fields; `#[injectable]` on an impl
//! block turns its associated functions returning `Self` into constructors.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{
    parenthesized, parse_macro_input, Attribute, Data, DeriveInput, Error, Fields, FnArg,
    GenericArgument, Generics, ImplItem, ImplItemFn, ItemImpl, PathArguments, ReturnType, Token,
    Type,
};

const PARAMETER_TYPES: &str = "injected values must be `Arc<T>`, `Option<Arc<T>>` or `Vec<Arc<T>>`";

#[derive(Default)]
struct Options {
    provides: Vec<Type>,
    dispose: bool,
}

impl Options {
    fn parse_meta(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("provides") {
            let content;
            parenthesized!(content in meta.input);
            let services = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
            self.provides.extend(services);
            Ok(())
        } else if meta.path.is_ident("dispose") {
            self.dispose = true;
            Ok(())
        } else {
            Err(meta.error("expected `provides(...)` or `dispose`"))
        }
    }
}

enum Kind {
    Required,
    Optional,
    Sequence,
}

/// A value the container supplies: the service type plus how it is asked for.
struct Injected<'a> {
    kind: Kind,
    service: &'a Type,
}

impl<'a> Injected<'a> {
    fn classify(ty: &'a Type) -> Option<Self> {
        let (outer, inner) = single_argument(ty)?;
        let (kind, service) = match outer.as_str() {
            "Arc" => (Kind::Required, inner),
            "Option" => (Kind::Optional, arc_argument(inner)?),
            "Vec" => (Kind::Sequence, arc_argument(inner)?),
            _ => return None,
        };
        Some(Self { kind, service })
    }

    fn parameter(&self) -> TokenStream2 {
        let service = self.service;
        match self.kind {
            Kind::Required => quote!(::keel_di::Parameter::required::<#service>()),
            Kind::Optional => quote!(::keel_di::Parameter::optional::<#service>()),
            Kind::Sequence => quote!(::keel_di::Parameter::sequence::<#service>()),
        }
    }

    fn resolve(&self) -> TokenStream2 {
        let service = self.service;
        match self.kind {
            Kind::Required => quote!(context.resolve_as::<#service>()?),
            Kind::Optional => quote!(context.try_resolve_as::<#service>()?),
            Kind::Sequence => quote!(context.resolve_all::<#service>()?),
        }
    }
}

/// `Outer<Inner>` with exactly one type argument.
fn single_argument(ty: &Type) -> Option<(String, &Type)> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match (arguments.args.len(), arguments.args.first()?) {
        (1, GenericArgument::Type(inner)) => Some((segment.ident.to_string(), inner)),
        _ => None,
    }
}

fn arc_argument(ty: &Type) -> Option<&Type> {
    match single_argument(ty)? {
        (outer, inner) if outer == "Arc" => Some(inner),
        _ => None,
    }
}

/// Implements `Injectable` from the struct's fields, in declaration order.
///
/// `#[keel(provides(dyn Service, ...), dispose)]` also implements `Provides` for each listed
/// service and registers the type's `Dispose` impl as its disposal hook.
#[proc_macro_derive(Injectable, attributes(keel))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_derive(input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn expand_derive(input: DeriveInput) -> syn::Result<TokenStream2> {
    let mut options = Options::default();
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("keel")) {
        attr.parse_nested_meta(|meta| options.parse_meta(meta))?;
    }
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "Injectable can only be derived for structs",
        ));
    };

    let name = &input.ident;
    let mut parameters = Vec::new();
    let body = match &data.fields {
        Fields::Named(fields) => {
            let mut values = Vec::new();
            for field in &fields.named {
                let injected = Injected::classify(&field.ty)
                    .ok_or_else(|| Error::new_spanned(&field.ty, PARAMETER_TYPES))?;
                let ident = &field.ident;
                let resolve = injected.resolve();
                parameters.push(injected.parameter());
                values.push(quote!(#ident: #resolve));
            }
            quote!(#name { #(#values),* })
        }
        Fields::Unnamed(fields) => {
            let mut values = Vec::new();
            for field in &fields.unnamed {
                let injected = Injected::classify(&field.ty)
                    .ok_or_else(|| Error::new_spanned(&field.ty, PARAMETER_TYPES))?;
                parameters.push(injected.parameter());
                values.push(injected.resolve());
            }
            quote!(#name(#(#values),*))
        }
        Fields::Unit => quote!(#name),
    };

    let build = if parameters.is_empty() {
        quote!(|_| ::std::result::Result::Ok(#body))
    } else {
        quote!(|context| ::std::result::Result::Ok(#body))
    };
    let constructor = quote! {
        ::keel_di::Constructor::new("fields", ::std::vec![#(#parameters),*], #build)
    };
    let (_, type_generics, _) = input.generics.split_for_impl();
    Ok(implement(
        &input.generics,
        quote!(#name #type_generics),
        vec![constructor],
        &options,
    ))
}

/// Turns every associated function of an inherent impl block that returns `Self` (or
/// `Result<Self, E>`) into a constructor. Mark the one the host should prefer with `#[inject]`.
///
/// Accepts the same `provides(...)` and `dispose` options as the derive.
#[proc_macro_attribute]
pub fn injectable(args: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = Options::default();
    let parser = syn::meta::parser(|meta| options.parse_meta(meta));
    parse_macro_input!(args with parser);
    let item = parse_macro_input!(item as ItemImpl);
    expand_impl(item, &options)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

enum Returns {
    Value,
    Fallible,
}

fn expand_impl(mut item: ItemImpl, options: &Options) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new_spanned(
            path,
            "#[injectable] goes on an inherent impl block",
        ));
    }
    let self_ty = item.self_ty.clone();
    let mut constructors = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(function) = impl_item else {
            continue;
        };
        let marked = take_inject_marker(&mut function.attrs);
        let returns = match (function.sig.receiver(), constructor_return(&function.sig.output, &self_ty)) {
            (None, Some(returns)) => returns,
            _ if marked => {
                return Err(Error::new_spanned(
                    &function.sig,
                    "#[inject] marks an associated function returning `Self`",
                ))
            }
            _ => continue,
        };
        constructors.push(constructor_for(&self_ty, function, returns, marked)?);
    }
    if constructors.is_empty() {
        return Err(Error::new_spanned(
            &item.self_ty,
            "no constructor found: add an associated function returning `Self`",
        ));
    }
    let implementation = implement(&item.generics, quote!(#self_ty), constructors, options);
    Ok(quote! {
        #item
        #implementation
    })
}

fn take_inject_marker(attrs: &mut Vec<Attribute>) -> bool {
    let before = attrs.len();
    attrs.retain(|attr| !attr.path().is_ident("inject"));
    attrs.len() != before
}

fn constructor_return(output: &ReturnType, self_ty: &Type) -> Option<Returns> {
    let ReturnType::Type(_, ty) = output else {
        return None;
    };
    if is_self(ty, self_ty) {
        return Some(Returns::Value);
    }
    let Type::Path(path) = ty.as_ref() else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.first()? {
        GenericArgument::Type(ok) if segment.ident == "Result" && is_self(ok, self_ty) => {
            Some(Returns::Fallible)
        }
        _ => None,
    }
}

fn is_self(ty: &Type, self_ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() && path.path.is_ident("Self") => true,
        _ => quote!(#ty).to_string() == quote!(#self_ty).to_string(),
    }
}

fn constructor_for(
    self_ty: &Type,
    function: &ImplItemFn,
    returns: Returns,
    marked: bool,
) -> syn::Result<TokenStream2> {
    let name = &function.sig.ident;
    let label = name.to_string();
    let mut parameters = Vec::new();
    let mut arguments = Vec::new();
    for input in &function.sig.inputs {
        let FnArg::Typed(argument) = input else {
            continue;
        };
        let injected = Injected::classify(&argument.ty)
            .ok_or_else(|| Error::new_spanned(&argument.ty, PARAMETER_TYPES))?;
        parameters.push(injected.parameter());
        arguments.push(injected.resolve());
    }

    let call = quote!(<#self_ty>::#name(#(#arguments),*));
    let body = match returns {
        Returns::Value => quote!(::std::result::Result::Ok(#call)),
        Returns::Fallible => quote! {
            #call.map_err(|error| {
                ::keel_di::IntoContainerError::into_factory_error(
                    error,
                    &::keel_di::ServiceType::of::<Self>(),
                )
            })
        },
    };
    let build = if parameters.is_empty() {
        quote!(|_| #body)
    } else {
        quote!(|context| #body)
    };
    let marker = marked.then(|| quote!(.marked()));
    Ok(quote! {
        ::keel_di::Constructor::new(#label, ::std::vec![#(#parameters),*], #build)#marker
    })
}

fn implement(
    generics: &Generics,
    self_ty: TokenStream2,
    constructors: Vec<TokenStream2>,
    options: &Options,
) -> TokenStream2 {
    let (impl_generics, _, where_clause) = generics.split_for_impl();
    let disposer = options.dispose.then(|| {
        quote! {
            fn disposer(
                this: &::std::sync::Arc<Self>,
            ) -> ::std::option::Option<::std::sync::Arc<dyn ::keel_di::Dispose>> {
                ::std::option::Option::Some(
                    ::std::sync::Arc::clone(this) as ::std::sync::Arc<dyn ::keel_di::Dispose>
                )
            }
        }
    });
    let provides = options.provides.iter().map(|service| {
        quote! {
            impl #impl_generics ::keel_di::Provides<#service> for #self_ty #where_clause {
                fn provide(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<#service> {
                    self
                }
            }
        }
    });
    quote! {
        impl #impl_generics ::keel_di::Injectable for #self_ty #where_clause {
            fn constructors() -> ::std::vec::Vec<::keel_di::Constructor<Self>> {
                ::std::vec![#(#constructors),*]
            }
            #disposer
        }
        #(#provides)*
    }
}
