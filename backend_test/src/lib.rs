use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat,
    PathArguments, Signature, Type, TypePath,
};

/// Turn an `async` test into a synchronous `#[test]` that runs against its own
/// throwaway database, which is dropped however the test ends.
///
/// Parameters are injected by type, in any order:
///
/// - `Client`: a [`rocket::local::asynchronous::Client`] for the full server.
/// - `Database`: the test's [`mongodb::Database`].
/// - `Coll<T>`: a typed collection in that database.
/// - `Header`: an `Authorization` header for a freshly registered example user.
#[proc_macro_attribute]
pub fn backend_test(_args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    let injections = match injections(&item_fn.sig) {
        Ok(injections) => injections,
        Err(err) => return err.into_compile_error().into(),
    };
    let args = injections.iter().map(Injection::ident);
    // The client is moved by its own binding, so anything borrowing it goes first.
    let mut ordered = injections.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|injection| match injection {
        Injection::AuthHeader(_) => 0,
        Injection::Client(_) => 2,
        _ => 1,
    });
    let bindings = ordered.into_iter().map(Injection::binding);

    // The body keeps its code but moves aside, so the test can take its name.
    let name = item_fn.sig.ident.clone();
    let body_name = format_ident!("{}_body", name);
    item_fn.sig.ident = body_name.clone();

    quote! {
        #[test]
        fn #name() {
            #item_fn

            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let rocket = crate::rocket_for_db(db_client.clone(), &db_name).await;
                let client = rocket::local::asynchronous::Client::tracked(rocket)
                    .await
                    .unwrap();
                (client, db_client.database(&db_name))
            }

            // One runtime drives setup and cleanup; the other runs the test and
            // may be poisoned by a panic.
            let build_runtime = |name: &str| {
                rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name(name)
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap()
            };
            let harness_runtime = build_runtime("test-harness");
            let test_runtime = build_runtime("rocket-worker-test-thread");

            let (client, db) = harness_runtime.block_on(setup());

            // `Mutex` carries the `!UnwindSafe` state across the unwind boundary.
            let state = std::sync::Mutex::new((client, db.clone(), test_runtime));
            let outcome = std::panic::catch_unwind(|| {
                #[allow(unused_variables)]
                let (client, db, runtime) = state.into_inner().unwrap();
                #(#bindings)*
                runtime.block_on(#body_name(#(#args),*));
            });

            harness_runtime.block_on(async move { db.drop(None).await.unwrap() });

            if let Err(cause) = outcome {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Something the harness constructs and hands to the test.
enum Injection {
    Client(Ident),
    Database(Ident),
    Collection(Ident, TypePath),
    AuthHeader(Ident),
}

impl Injection {
    /// The parameter name in the test.
    fn ident(&self) -> &Ident {
        match self {
            Self::Client(ident)
            | Self::Database(ident)
            | Self::Collection(ident, _)
            | Self::AuthHeader(ident) => ident,
        }
    }

    /// The statement binding this parameter, run before the test body.
    fn binding(&self) -> TokenStream2 {
        match self {
            Self::Client(ident) => quote! { let #ident = client; },
            Self::Database(ident) => quote! { let #ident = db.clone(); },
            Self::Collection(ident, doc_type) => quote! {
                let #ident = crate::model::mongodb::Coll::<#doc_type>::from_db(&db);
            },
            Self::AuthHeader(ident) => quote! {
                let (_, #ident) = runtime.block_on(crate::api::auth::testing::register_user(
                    &client,
                    crate::model::api::auth::UserCredentials::example(),
                ));
            },
        }
    }
}

/// Work out what to inject for each parameter of the test, rejecting
/// signatures the harness cannot satisfy.
fn injections(sig: &Signature) -> Result<Vec<Injection>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injections = Vec::new();
    for input in &sig.inputs {
        let injection = injection(input).ok_or_else(|| {
            syn::Error::new(
                input.span(),
                "Expected `_: Client`, `_: Database`, `_: Coll<T>` or `_: Header`",
            )
        })?;
        let duplicate = injections.iter().any(|other: &Injection| {
            !matches!(other, Injection::Collection(..))
                && std::mem::discriminant(other) == std::mem::discriminant(&injection)
        });
        if duplicate {
            return Err(syn::Error::new(
                input.span(),
                "Only collections may be injected more than once",
            ));
        }
        injections.push(injection);
    }

    Ok(injections)
}

/// Classify a single parameter by its type.
fn injection(input: &FnArg) -> Option<Injection> {
    let FnArg::Typed(pat_type) = input else {
        return None;
    };
    let Pat::Ident(pat_ident) = &*pat_type.pat else {
        return None;
    };
    let Type::Path(type_path) = &*pat_type.ty else {
        return None;
    };
    let ident = pat_ident.ident.clone();

    let last = type_path.path.segments.last()?;
    match last.ident.to_string().as_str() {
        "Client" => Some(Injection::Client(ident)),
        "Database" => Some(Injection::Database(ident)),
        "Header" => Some(Injection::AuthHeader(ident)),
        "Coll" => {
            let PathArguments::AngleBracketed(generics) = &last.arguments else {
                return None;
            };
            match generics.args.first()? {
                GenericArgument::Type(Type::Path(doc_type)) => {
                    Some(Injection::Collection(ident, doc_type.clone()))
                }
                _ => None,
            }
        }
        _ => None,
    }
}
