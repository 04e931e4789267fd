use super::{ClientBuilder, IdentScope, ty};
use clientgen_schema::resolve::{
    PropertyOrigin, ResolvedComplexType, ResolvedEntity, ResolvedProperty,
};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

// Data types: complex types first, then entities root by root.
pub fn generate(builder: &mut ClientBuilder<'_, '_>) -> Result<(), String> {
    let model = builder.model;

    for complex in model.complex_types.values() {
        let ident = ty::type_ident(complex.name.short_name())?;
        builder.claim_type(&complex.name, &ident)?;
        let tokens = complex_struct(builder, complex, &ident)?;
        builder.emit(&complex.name, tokens)?;
    }

    for entity in model.entities_in_emission_order() {
        let ident = ty::type_ident(entity.name.short_name())?;
        builder.claim_type(&entity.name, &ident)?;
        let tokens = entity_struct(builder, entity, &ident)?;
        builder.emit(&entity.name, tokens)?;
    }

    for root in model.entities.values().filter(|e| e.is_root()) {
        if root.derived.is_empty() {
            continue;
        }
        let ident = format_ident!("{}Kind", ty::type_ident(root.name.short_name())?);
        builder.claim_type(&root.name, &ident)?;
        let tokens = kind_enum(builder, root, &ident)?;
        builder.emit(&root.name, tokens)?;
    }

    Ok(())
}

fn complex_struct(
    builder: &ClientBuilder<'_, '_>,
    complex: &ResolvedComplexType,
    ident: &Ident,
) -> Result<TokenStream, String> {
    let docs = builder.annotation_docs(&complex.annotations, complex.name.as_str());

    let mut scope = IdentScope::new(complex.name.as_str());
    let mut fields = quote!();
    for member in &complex.members {
        let field = ty::member_ident(&member.name)?;
        scope.claim(&field, &member.name)?;
        let field_ty = builder.paths.value_type(&member.ty)?;
        let target = format!("{}.{}", complex.name, member.name);
        let member_docs = builder.annotation_docs(&member.annotations, &target);

        fields.extend(quote! {
            #member_docs
            pub #field: #field_ty,
        });
    }

    Ok(quote! {
        #docs
        #[derive(Clone, Debug, PartialEq)]
        pub struct #ident {
            #fields
        }
    })
}

fn entity_struct(
    builder: &ClientBuilder<'_, '_>,
    entity: &ResolvedEntity,
    ident: &Ident,
) -> Result<TokenStream, String> {
    let docs = builder.annotation_docs(&entity.annotations, entity.name.as_str());

    let mut scope = IdentScope::new(entity.name.as_str());
    let mut fields = quote!();
    for member in &entity.members {
        if builder
            .host
            .member_shared_by_source(&member.declared_on, &member.name)
        {
            continue;
        }
        fields.extend(entity_field(builder, entity, member, &mut scope)?);
    }

    let kind_doc = entity.visible_base.as_ref().map(|base| {
        let line = format!("Derives from `{base}`.");
        quote!(#[doc = #line])
    });
    let abstract_doc = entity
        .is_abstract
        .then(|| quote!(#[doc = "Abstract; never materialized on its own."]));

    let key_impl = if entity.is_root() && !entity.key.is_empty() {
        let key = &entity.key;
        quote! {
            impl #ident {
                pub const KEY: &'static [&'static str] = &[#(#key),*];
            }
        }
    } else {
        quote!()
    };

    Ok(quote! {
        #docs
        #kind_doc
        #abstract_doc
        #[derive(Clone, Debug, PartialEq)]
        pub struct #ident {
            #fields
        }
        #key_impl
    })
}

fn entity_field(
    builder: &ClientBuilder<'_, '_>,
    entity: &ResolvedEntity,
    member: &ResolvedProperty,
    scope: &mut IdentScope,
) -> Result<TokenStream, String> {
    let field = ty::member_ident(&member.name)?;
    scope.claim(&field, &member.name)?;
    let field_ty = builder.paths.value_type(&member.ty)?;

    // inherited annotations were reviewed on the base
    let docs = if member.declare_here {
        let target = format!("{}.{}", entity.name, member.name);
        builder.annotation_docs(&member.annotations, &target)
    } else {
        quote!()
    };

    let origin = match &member.origin {
        PropertyOrigin::Declared => None,
        PropertyOrigin::Lifted { from } => Some(format!("Declared on `{from}`.")),
        PropertyOrigin::Projected { via, source, .. } => {
            Some(format!("Projected from `{via}.{source}`."))
        }
    }
    .filter(|_| member.declare_here)
    .map(|line| quote!(#[doc = #line]));

    Ok(quote! {
        #docs
        #origin
        pub #field: #field_ty,
    })
}

// One variant per concrete entity of a polymorphic hierarchy.
fn kind_enum(
    builder: &ClientBuilder<'_, '_>,
    root: &ResolvedEntity,
    ident: &Ident,
) -> Result<TokenStream, String> {
    let concrete = std::iter::once(root)
        .chain(
            root.derived
                .iter()
                .filter_map(|name| builder.model.entity(name.as_str())),
        )
        .filter(|e| e.instantiable && !e.is_abstract);

    let mut scope = IdentScope::new(ident.to_string());
    let mut variants = quote!();
    for entity in concrete {
        let variant = ty::type_ident(entity.name.short_name())?;
        scope.claim(&variant, entity.name.short_name())?;
        let path = builder.paths.type_path(&entity.name)?;
        variants.extend(quote!(#variant(#path),));
    }

    Ok(quote! {
        #[derive(Clone, Debug, PartialEq)]
        pub enum #ident {
            #variants
        }
    })
}
