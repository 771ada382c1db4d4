extern crate quote;
extern crate syn;

extern crate proc_macro;

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, LitStr, Token, punctuated::Punctuated, spanned::Spanned};
use syn::{Data, DeriveInput, Fields, Type};

/// Implements `MessageHandler` for a module.
///
/// ```ignore
/// message_handlers!(impl Master {
///     SetMuted(muted) => Master::set_muted,
///     CycleGroup => Master::cycle,
/// });
/// ```
#[proc_macro]
pub fn message_handlers(input: TokenStream) -> TokenStream {
    struct Arm {
        variant: Ident,
        bindings: Vec<Ident>,
        handler: syn::Path,
    }

    struct Input {
        ty: Ident,
        arms: Vec<Arm>,
    }

    impl Parse for Arm {
        fn parse(input: ParseStream) -> syn::Result<Self> {
            let variant: Ident = input.parse()?;

            let bindings = if input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in input);
                let parsed: Punctuated<Ident, Token![,]> =
                    content.parse_terminated(Ident::parse, Token![,])?;
                parsed.into_iter().collect()
            } else {
                Vec::new()
            };

            input.parse::<Token![=>]>()?;
            let handler: syn::Path = input.parse()?;

            Ok(Self {
                variant,
                bindings,
                handler,
            })
        }
    }

    impl Parse for Input {
        fn parse(input: ParseStream) -> syn::Result<Self> {
            input.parse::<Token![impl]>()?;
            let ty: Ident = input.parse()?;

            let content;
            syn::braced!(content in input);

            let mut arms = Vec::new();
            while !content.is_empty() {
                let arm: Arm = content.parse()?;
                arms.push(arm);
                let _ = content.parse::<Token![,]>();
            }

            Ok(Self { ty, arms })
        }
    }

    let parsed: Input = match syn::parse(input) {
        Ok(v) => v,
        Err(e) => return e.to_compile_error().into(),
    };

    let ty = parsed.ty;

    if parsed.arms.is_empty() {
        return quote! {
            impl crate::types::MessageHandler for #ty {}
        }
        .into();
    }

    // Deduplicate tags while preserving order.
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut tag_variants: Vec<Ident> = Vec::new();
    for arm in &parsed.arms {
        if seen.insert(arm.variant.to_string()) {
            tag_variants.push(arm.variant.clone());
        }
    }

    let tag_exprs: Vec<TokenStream2> = tag_variants
        .iter()
        .map(|v| quote!(crate::types::MessageTag::#v))
        .collect();

    let match_arms: Vec<TokenStream2> = parsed
        .arms
        .iter()
        .map(|arm| {
            let variant = &arm.variant;
            let handler = &arm.handler;
            if arm.bindings.is_empty() {
                quote! {
                    crate::types::Message::#variant => #handler(self)
                }
            } else {
                let bindings = &arm.bindings;
                quote! {
                    crate::types::Message::#variant( #( #bindings ),* ) => #handler(self, #( #bindings ),* )
                }
            }
        })
        .collect();

    quote! {
        impl crate::types::MessageHandler for #ty {
            fn handled_message_tags(&self) -> &'static [crate::types::MessageTag] {
                &[ #( #tag_exprs ),* ]
            }

            fn handle_message(&mut self, message: &crate::types::Message) -> anyhow::Result<()> {
                match *message {
                    #( #match_arms, )*
                    #[allow(unreachable_patterns)]
                    _ => Ok(()),
                }
            }
        }
    }
    .into()
}

#[proc_macro_derive(Outputs, attributes(output))]
pub fn outputs_macro_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).unwrap();
    impl_outputs_macro(&ast)
}

#[proc_macro_derive(Inputs, attributes(input))]
pub fn inputs_macro_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).unwrap();
    impl_inputs_macro(&ast)
}

#[proc_macro_derive(EnumTag, attributes(enum_tag))]
pub fn enum_tag_macro_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).unwrap();
    impl_enum_tag_macro(&ast)
}

fn parse_enum_tag_name(attrs: &[Attribute], default_ident: Ident) -> syn::Result<Ident> {
    let mut found: Option<Ident> = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("enum_tag")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                let ident = syn::parse_str::<Ident>(&value.value()).map_err(|_| {
                    syn::Error::new(
                        value.span(),
                        "enum_tag name must be a valid Rust identifier",
                    )
                })?;
                found = Some(ident);
                Ok(())
            } else {
                Err(meta.error("unsupported enum_tag attribute; expected `name = \"...\"`"))
            }
        })?;
    }

    Ok(found.unwrap_or(default_ident))
}

fn impl_enum_tag_macro(ast: &DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let vis = &ast.vis;

    let default_tag_name = format_ident!("{}Tag", name);
    let tag_name = match parse_enum_tag_name(&ast.attrs, default_tag_name) {
        Ok(v) => v,
        Err(e) => return e.to_compile_error().into(),
    };

    let data_enum = match &ast.data {
        Data::Enum(e) => e,
        Data::Struct(_) | Data::Union(_) => {
            return syn::Error::new(Span::call_site(), "EnumTag can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let mut tag_variants: Vec<TokenStream2> = Vec::new();
    let mut match_arms: Vec<TokenStream2> = Vec::new();
    for v in &data_enum.variants {
        let v_ident = &v.ident;
        tag_variants.push(quote!(#v_ident));

        let pat = match &v.fields {
            Fields::Unit => quote!(Self::#v_ident),
            Fields::Unnamed(_) => quote!(Self::#v_ident(..)),
            Fields::Named(_) => quote!(Self::#v_ident { .. }),
        };
        match_arms.push(quote!(#pat => #tag_name::#v_ident));
    }

    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    quote! {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #vis enum #tag_name {
            #( #tag_variants, )*
        }

        impl #impl_generics #name #ty_generics #where_clause {
            #vis fn tag(&self) -> #tag_name {
                match self {
                    #( #match_arms, )*
                }
            }
        }
    }
    .into()
}

fn unwrap_attr(attrs: &[Attribute], ident: &str) -> Option<TokenStream2> {
    attrs
        .iter()
        .find(|attr| attr.path().is_ident(ident))
        .and_then(|attr| {
            if let syn::Meta::List(list) = &attr.meta {
                Some(list.tokens.clone())
            } else {
                None
            }
        })
}

/// Parsed `#[output(...)]` / `#[input(...)]` attribute.
struct PortAttr {
    name: Option<LitStr>,
    description: Option<LitStr>,
    is_default: bool,
}

/// Supports:
/// - #[output]
/// - #[output("name", "description")]
/// - #[output("name", "description", default)]
fn parse_port_attr(tokens: Option<TokenStream2>) -> syn::Result<PortAttr> {
    impl Parse for PortAttr {
        fn parse(input: ParseStream) -> syn::Result<Self> {
            let mut attr = PortAttr {
                name: None,
                description: None,
                is_default: false,
            };
            if input.is_empty() {
                return Ok(attr);
            }

            attr.name = Some(input.parse()?);
            while input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
                if input.is_empty() {
                    break;
                }
                if input.peek(LitStr) {
                    attr.description = Some(input.parse()?);
                } else {
                    let ident: Ident = input.parse()?;
                    if ident != "default" {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("Expected 'default', found '{}'", ident),
                        ));
                    }
                    attr.is_default = true;
                }
            }
            Ok(attr)
        }
    }

    match tokens {
        Some(tokens) => syn::parse2::<PortAttr>(tokens),
        None => Ok(PortAttr {
            name: None,
            description: None,
            is_default: false,
        }),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PortKind {
    F32,
    Poly,
}

struct PortField {
    field_name: Ident,
    port_name: String,
    description: String,
    is_default: bool,
    kind: PortKind,
}

fn port_kind(ty: &Type, allowed_poly: &str) -> Option<PortKind> {
    match ty {
        Type::Path(tp) => match tp
            .path
            .segments
            .last()
            .map(|seg| seg.ident.to_string())
            .as_deref()
        {
            Some("f32") => Some(PortKind::F32),
            Some(name) if name == allowed_poly => Some(PortKind::Poly),
            _ => None,
        },
        _ => None,
    }
}

/// Collects annotated port fields. A field without a name in its attribute
/// is exposed under its own name in kebab case.
fn collect_ports(
    ast: &DeriveInput,
    attr_name: &str,
    poly_type: &str,
) -> Result<Vec<PortField>, TokenStream> {
    let fields = match ast.data {
        Data::Struct(ref data) => match data.fields {
            Fields::Named(ref fields) => fields,
            Fields::Unnamed(_) | Fields::Unit => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "ports can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into());
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(
                syn::Error::new(Span::call_site(), "ports can only be derived for structs")
                    .to_compile_error()
                    .into(),
            );
        }
    };

    let mut out = Vec::new();
    for f in fields.named.iter() {
        let field_name = f.ident.clone().expect("named field");
        let kind = match port_kind(&f.ty, poly_type) {
            Some(kind) => kind,
            None => {
                return Err(syn::Error::new(
                    f.ty.span(),
                    format!("Port fields must have type f32 or {}", poly_type),
                )
                .to_compile_error()
                .into());
            }
        };
        let attr = parse_port_attr(unwrap_attr(&f.attrs, attr_name))
            .map_err(|e| TokenStream::from(e.to_compile_error()))?;
        let port_name = attr
            .name
            .map(|n| n.value())
            .unwrap_or_else(|| field_name.to_string().to_case(Case::Kebab));
        out.push(PortField {
            field_name,
            port_name,
            description: attr.description.map(|d| d.value()).unwrap_or_default(),
            is_default: attr.is_default,
            kind,
        });
    }
    Ok(out)
}

fn impl_outputs_macro(ast: &DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let outputs = match collect_ports(ast, "output", "PolyOutput") {
        Ok(o) => o,
        Err(e) => return e,
    };

    let default_count = outputs.iter().filter(|o| o.is_default).count();
    if default_count > 1 {
        let error_msg = format!(
            "Outputs struct '{}' has {} outputs marked as default, but only one is allowed",
            name, default_count
        );
        return syn::Error::new(Span::call_site(), error_msg)
            .to_compile_error()
            .into();
    }

    let field_defaults: Vec<_> = outputs
        .iter()
        .map(|o| {
            let field_name = &o.field_name;
            match o.kind {
                PortKind::F32 => quote! { #field_name: 0.0 },
                PortKind::Poly => quote! { #field_name: crate::poly::PolyOutput::default() },
            }
        })
        .collect();

    let match_arms: Vec<_> = outputs
        .iter()
        .map(|o| {
            let port_name = &o.port_name;
            let field_name = &o.field_name;
            match o.kind {
                PortKind::F32 => quote! {
                    #port_name => Some(crate::poly::PolyOutput::mono(self.#field_name)),
                },
                PortKind::Poly => quote! {
                    #port_name => Some(self.#field_name),
                },
            }
        })
        .collect();

    let schema_exprs: Vec<_> = outputs
        .iter()
        .map(|o| {
            let port_name = &o.port_name;
            let description = &o.description;
            let is_default = o.is_default;
            let polyphonic = o.kind == PortKind::Poly;
            quote! {
                crate::types::PortSchema {
                    name: #port_name.to_string(),
                    description: #description.to_string(),
                    default: #is_default,
                    polyphonic: #polyphonic,
                }
            }
        })
        .collect();

    quote! {
        impl Default for #name {
            fn default() -> Self {
                Self {
                    #(#field_defaults,)*
                }
            }
        }

        impl crate::types::OutputStruct for #name {
            fn get_output(&self, port: &str) -> Option<crate::poly::PolyOutput> {
                match port {
                    #(#match_arms)*
                    _ => None,
                }
            }

            fn schemas() -> Vec<crate::types::PortSchema> {
                vec![
                    #(#schema_exprs,)*
                ]
            }
        }
    }
    .into()
}

fn impl_inputs_macro(ast: &DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let inputs = match collect_ports(ast, "input", "PolyInput") {
        Ok(i) => i,
        Err(e) => return e,
    };

    let field_defaults: Vec<_> = inputs
        .iter()
        .map(|i| {
            let field_name = &i.field_name;
            match i.kind {
                PortKind::F32 => quote! { #field_name: 0.0 },
                PortKind::Poly => quote! { #field_name: crate::poly::PolyInput::default() },
            }
        })
        .collect();

    let match_arms: Vec<_> = inputs
        .iter()
        .map(|i| {
            let port_name = &i.port_name;
            let field_name = &i.field_name;
            match i.kind {
                PortKind::F32 => quote! {
                    #port_name => { self.#field_name = value.get(0); true }
                },
                PortKind::Poly => quote! {
                    #port_name => { self.#field_name = value; true }
                },
            }
        })
        .collect();

    let schema_exprs: Vec<_> = inputs
        .iter()
        .map(|i| {
            let port_name = &i.port_name;
            let description = &i.description;
            let polyphonic = i.kind == PortKind::Poly;
            quote! {
                crate::types::PortSchema {
                    name: #port_name.to_string(),
                    description: #description.to_string(),
                    default: false,
                    polyphonic: #polyphonic,
                }
            }
        })
        .collect();

    quote! {
        impl Default for #name {
            fn default() -> Self {
                Self {
                    #(#field_defaults,)*
                }
            }
        }

        impl crate::types::InputStruct for #name {
            fn set_input(&mut self, port: &str, value: crate::poly::PolyInput) -> bool {
                match port {
                    #(#match_arms,)*
                    _ => false,
                }
            }

            fn schemas() -> Vec<crate::types::PortSchema> {
                vec![
                    #(#schema_exprs,)*
                ]
            }
        }
    }
    .into()
}

/// Parsed module attribute data
struct ModuleAttr {
    slug: LitStr,
    description: Option<LitStr>,
    width: u32,
    participant: Option<Ident>,
    lights: bool,
}

/// Supports:
/// - #[module("slug", "description")]
/// - #[module("slug", "description", width = N)]
/// - #[module("slug", "description", width = N, participant = Kind, lights)]
fn parse_module_attr(attrs: &[Attribute]) -> syn::Result<ModuleAttr> {
    impl Parse for ModuleAttr {
        fn parse(input: ParseStream) -> syn::Result<Self> {
            let slug: LitStr = input.parse()?;

            let mut attr = ModuleAttr {
                slug,
                description: None,
                width: 1,
                participant: None,
                lights: false,
            };

            while input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
                if input.is_empty() {
                    break;
                }

                if input.peek(LitStr) {
                    attr.description = Some(input.parse()?);
                    continue;
                }

                let ident: Ident = input.parse()?;
                if ident == "width" {
                    input.parse::<Token![=]>()?;
                    let lit: syn::LitInt = input.parse()?;
                    attr.width = lit.base10_parse()?;
                } else if ident == "participant" {
                    input.parse::<Token![=]>()?;
                    attr.participant = Some(input.parse()?);
                } else if ident == "lights" {
                    attr.lights = true;
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!(
                            "Unknown module attribute '{}'. Expected 'width', 'participant', or 'lights'",
                            ident
                        ),
                    ));
                }
            }

            Ok(attr)
        }
    }

    let tokens = unwrap_attr(attrs, "module").ok_or_else(|| {
        syn::Error::new(Span::call_site(), "Missing #[module(...)] attribute")
    })?;
    syn::parse2::<ModuleAttr>(tokens)
}

/// Finds the type of a required named field on the module struct.
fn field_type(ast: &DeriveInput, field: &str) -> Option<Type> {
    match ast.data {
        Data::Struct(ref data) => match data.fields {
            Fields::Named(ref fields) => fields
                .named
                .iter()
                .find(|f| f.ident.as_ref().map(|i| i == field).unwrap_or(false))
                .map(|f| f.ty.clone()),
            _ => None,
        },
        _ => None,
    }
}

#[proc_macro_derive(Module, attributes(module, stateful))]
pub fn module_macro_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).unwrap();
    impl_module_macro(&ast)
}

fn impl_module_macro(ast: &DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let module_attr = match parse_module_attr(&ast.attrs) {
        Ok(attr) => attr,
        Err(e) => return e.to_compile_error().into(),
    };
    let slug = &module_attr.slug;
    let description = module_attr
        .description
        .as_ref()
        .map(|d| d.value())
        .unwrap_or_default();
    let width = module_attr.width;

    let mut required = Vec::new();
    for field in ["outputs", "inputs", "params"] {
        match field_type(ast, field) {
            Some(ty) => required.push(ty),
            None => {
                return syn::Error::new(
                    Span::call_site(),
                    format!("#[derive(Module)] requires a field named `{}`", field),
                )
                .to_compile_error()
                .into();
            }
        }
    }
    let outputs_ty = &required[0];
    let inputs_ty = &required[1];
    let params_ty = &required[2];

    let is_stateful = ast.attrs.iter().any(|attr| attr.path().is_ident("stateful"));
    let state_ty = field_type(ast, "state");
    if is_stateful && state_ty.is_none() {
        return syn::Error::new(
            Span::call_site(),
            "#[stateful] modules require a field named `state`",
        )
        .to_compile_error()
        .into();
    }

    let (participant_expr, process_call) = match &module_attr.participant {
        Some(kind) => (
            quote! { Some(crate::chain::ParticipantKind::#kind) },
            quote! { #name::process(self, args, chain) },
        ),
        None => (
            quote! { None },
            quote! {
                let _ = chain;
                #name::process(self, args)
            },
        ),
    };

    let light_impl = if module_attr.lights {
        quote! { #name::light(self, light) }
    } else {
        quote! {
            let _ = light;
            0.0
        }
    };

    let (get_state_impl, set_state_impl, state_keys_expr) = if is_stateful {
        let state_ty = state_ty.as_ref().expect("checked above");
        (
            quote! { serde_json::to_value(&self.state).ok() },
            quote! {
                self.state = serde_json::from_value(state)?;
                Ok(())
            },
            quote! {
                serde_json::to_value(<#state_ty as Default>::default())
                    .ok()
                    .and_then(|v| v.as_object().map(|o| o.keys().cloned().collect()))
                    .unwrap_or_default()
            },
        )
    } else {
        (
            quote! { None },
            quote! {
                let _ = state;
                Ok(())
            },
            quote! { Vec::new() },
        )
    };

    let constructor_name = format_ident!("{}Constructor", name)
        .to_string()
        .to_case(Case::Snake);
    let constructor_name = Ident::new(&constructor_name, Span::call_site());

    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    quote! {
        impl #impl_generics crate::types::RackModule for #name #ty_generics #where_clause {
            fn model(&self) -> &'static str {
                #slug
            }

            fn width_hp(&self) -> u32 {
                #width
            }

            fn participant(&self) -> Option<crate::chain::ParticipantKind> {
                #participant_expr
            }

            fn process(
                &mut self,
                args: &crate::types::ProcessArgs,
                chain: Option<&mut crate::chain::ChainIo<'_>>,
            ) {
                #process_call
            }

            fn set_input(&mut self, port: &str, value: crate::poly::PolyInput) -> anyhow::Result<()> {
                if crate::types::InputStruct::set_input(&mut self.inputs, port, value) {
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("{} does not have input {}", #slug, port))
                }
            }

            fn get_output(&self, port: &str) -> anyhow::Result<crate::poly::PolyOutput> {
                crate::types::OutputStruct::get_output(&self.outputs, port)
                    .ok_or_else(|| anyhow::anyhow!("{} does not have output {}", #slug, port))
            }

            fn try_update_params(&mut self, params: serde_json::Value) -> anyhow::Result<()> {
                self.params = serde_json::from_value(params)?;
                Ok(())
            }

            fn get_params(&self) -> serde_json::Value {
                serde_json::to_value(&self.params).unwrap_or(serde_json::Value::Null)
            }

            fn get_state(&self) -> Option<serde_json::Value> {
                #get_state_impl
            }

            fn set_state(&mut self, state: serde_json::Value) -> anyhow::Result<()> {
                #set_state_impl
            }

            fn light(&self, light: crate::types::LightId) -> f32 {
                #light_impl
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        fn #constructor_name() -> Box<dyn crate::types::RackModule> {
            Box::new(<#name #ty_generics as Default>::default())
        }

        impl #impl_generics crate::types::Module for #name #ty_generics #where_clause {
            fn install_constructor(map: &mut std::collections::HashMap<String, crate::types::ModuleConstructor>) {
                map.insert(#slug.into(), #constructor_name as crate::types::ModuleConstructor);
            }

            fn get_schema() -> crate::types::ModuleSchema {
                let params_schema = schemars::schema_for!(#params_ty);

                let inputs = <#inputs_ty as crate::types::InputStruct>::schemas();
                let outputs = <#outputs_ty as crate::types::OutputStruct>::schemas();
                if inputs.iter().any(|i| outputs.iter().any(|o| o.name == i.name)) {
                    panic!("{}: inputs and outputs must have unique names", #slug);
                }

                crate::types::ModuleSchema {
                    name: #slug.to_string(),
                    description: #description.to_string(),
                    width_hp: #width,
                    participant: #participant_expr,
                    params_schema: crate::types::SchemaContainer {
                        schema: params_schema,
                    },
                    inputs,
                    outputs,
                    state_keys: #state_keys_expr,
                }
            }
        }
    }
    .into()
}
