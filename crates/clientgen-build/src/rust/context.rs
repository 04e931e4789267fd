use super::{ClientBuilder, IdentScope, ty};
use clientgen_schema::{
    node::{OperationKind, QualifiedName, TypeRef},
    resolve::{ResolvedEntity, ResolvedModel, ResolvedOperation, ResolvedService},
};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

// Behaviour: entity method traits, then one context trait per service.
pub fn generate(builder: &mut ClientBuilder<'_, '_>) -> Result<(), String> {
    let model = builder.model;

    for entity in model.entities_in_emission_order() {
        if entity.methods.is_empty() {
            continue;
        }
        let ident = format_ident!("{}Methods", ty::type_ident(entity.name.short_name())?);
        builder.claim_type(&entity.name, &ident)?;
        let tokens = methods_trait(builder, entity, &ident)?;
        builder.emit(&entity.name, tokens)?;
    }

    for service in &model.services {
        let ident = ty::type_ident(service.context.short_name())?;
        builder.claim_type(&service.context, &ident)?;
        let tokens = context_trait(builder, service, &ident)?;
        builder.emit(&service.context, tokens)?;
    }

    Ok(())
}

fn bound_operation<'m>(
    model: &'m ResolvedModel,
    entity: &QualifiedName,
    method: &str,
) -> Option<&'m ResolvedOperation> {
    model
        .services
        .iter()
        .flat_map(|s| s.operations.iter())
        .find(|op| {
            op.kind == OperationKind::Custom
                && op.member.is_none()
                && op.name == method
                && op
                    .parameters
                    .first()
                    .is_some_and(|p| p.ty == TypeRef::Entity(entity.clone()))
        })
}

fn methods_trait(
    builder: &ClientBuilder<'_, '_>,
    entity: &ResolvedEntity,
    ident: &Ident,
) -> Result<TokenStream, String> {
    let mut scope = IdentScope::new(ident.to_string());
    let mut methods = quote!();
    for method in &entity.methods {
        let op = bound_operation(builder.model, &entity.name, method)
            .ok_or_else(|| format!("method '{method}' of '{}' has no operation", entity.name))?;
        let target = format!("{}.{method}", entity.name);

        // the first parameter is the bound entity itself
        methods.extend(signature(builder, op, method, 1, &target, &mut scope)?);
    }

    Ok(quote! {
        pub trait #ident {
            #methods
        }
    })
}

fn context_trait(
    builder: &ClientBuilder<'_, '_>,
    service: &ResolvedService,
    ident: &Ident,
) -> Result<TokenStream, String> {
    let docs = builder.annotation_docs(&service.annotations, service.name.as_str());

    let mut scope = IdentScope::new(service.context.as_str());
    let mut members = quote!();
    for set in &service.entity_sets {
        let method = ty::member_ident(&set.name)?;
        scope.claim(&method, &set.name)?;
        let entity = builder.paths.type_path(&set.entity)?;
        members.extend(quote! {
            fn #method(&self) -> Vec<#entity>;
        });
    }

    for op in &service.operations {
        let Some(member) = &op.member else {
            continue;
        };
        let target = format!("{}.{}", service.name, op.name);
        members.extend(signature(builder, op, member, 0, &target, &mut scope)?);
    }

    Ok(quote! {
        #docs
        pub trait #ident {
            #members
        }
    })
}

fn signature(
    builder: &ClientBuilder<'_, '_>,
    op: &ResolvedOperation,
    name: &str,
    skip: usize,
    target: &str,
    scope: &mut IdentScope,
) -> Result<TokenStream, String> {
    let method = ty::member_ident(name)?;
    scope.claim(&method, name)?;
    let docs = builder.annotation_docs(&op.annotations, target);

    let mut params = quote!();
    for param in op.parameters.iter().skip(skip) {
        let ident = ty::member_ident(&param.name)?;
        let param_ty = builder.paths.signature_type(&param.ty)?;
        params.extend(quote!(, #ident: #param_ty));
    }

    let returns = match &op.returns {
        Some(ty) => {
            let ty = builder.paths.signature_type(ty)?;
            quote!(-> #ty)
        }
        None => quote!(),
    };

    Ok(quote! {
        #docs
        fn #method(&self #params) #returns;
    })
}
