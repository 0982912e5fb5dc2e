//! `furni catalog` - browsing needs no account.

use furni_storefront::Catalog;

use super::CliError;
use crate::CatalogAction;
use crate::output;

pub fn run(catalog: &Catalog, action: CatalogAction) -> Result<(), CliError> {
    match action {
        CatalogAction::List { category, search } => {
            let products = catalog.filter(category.as_deref(), search.as_deref());
            output::products(&products);
        }
        CatalogAction::Categories => output::categories(&catalog.categories()),
    }
    Ok(())
}
