//! `furni favorites` - favorites commands.

use furni_storefront::{FileStore, StoreSession};

use super::CliError;
use crate::FavoritesAction;
use crate::output;

pub async fn run(
    session: &StoreSession<FileStore>,
    action: FavoritesAction,
) -> Result<(), CliError> {
    let favorites = session.favorites()?;
    match action {
        FavoritesAction::List => output::favorites(&favorites.list().await?),
        FavoritesAction::Toggle { id } => {
            if session.toggle_favorite(id).await? {
                output::success("Added to favorites.");
            } else {
                output::success("Removed from favorites.");
            }
        }
        FavoritesAction::Remove { id } => {
            if favorites.remove(id).await? {
                output::success("Removed from favorites.");
            } else {
                output::success("That product is not a favorite.");
            }
        }
        FavoritesAction::Clear => {
            favorites.clear().await?;
            output::success("Favorites cleared.");
        }
        FavoritesAction::ToCart { id } => {
            let quantity = favorites.move_to_cart(id, session.cart()?).await?;
            output::success(&format!("Added to cart ({quantity} in cart)."));
        }
    }
    Ok(())
}
