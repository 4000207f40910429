use tracing::{info, warn};

use super::render;
use super::{Actor, Engine, Reply, WorkflowError, WorkflowResult};
use crate::core::config::Target;
use crate::core::notify::MessageHandle;

const MENU_SETTING: &str = "shop_menu";

impl Engine {
    /// Replace the previous menu post with a fresh one at the bottom of the
    /// shop channel.
    pub async fn post_shop_menu(&self) -> WorkflowResult<MessageHandle> {
        if let Some(previous) = self.store.get_setting(MENU_SETTING).await?
            && let Ok(handle) = previous.parse::<MessageHandle>()
            && let Err(e) = self.notifier.delete(handle).await
        {
            warn!("[shop] Could not remove old menu {}: {}", handle, e);
        }
        let handle = self
            .post_to(Target::Shop, render::shop_menu(&self.config.shop))
            .await?;
        self.store
            .set_setting(MENU_SETTING, &handle.to_string())
            .await?;
        Ok(handle)
    }

    /// `!shop`, honoured only inside the shop channel.
    pub async fn shop_command(&self, channel_id: u64) -> WorkflowResult<Reply> {
        if !self.is_channel(Target::Shop, channel_id) {
            return Ok(Reply::None);
        }
        self.post_shop_menu().await?;
        Ok(Reply::None)
    }

    pub async fn wallet(&self, actor: &Actor) -> WorkflowResult<Reply> {
        let balance = self.store.balance(actor.id).await?;
        Ok(Reply::private(format!(
            "💳 Your Balance: **{} Us-Bucks**",
            balance
        )))
    }

    pub async fn purchase(&self, actor: &Actor, item_id: &str) -> WorkflowResult<Reply> {
        let item = self
            .config
            .shop_item(item_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("Item '{}'", item_id.trim())))?;
        if !self.store.debit_if_sufficient(actor.id, item.cost).await? {
            let available = self.store.balance(actor.id).await?;
            return Err(WorkflowError::InsufficientFunds {
                needed: item.cost,
                available,
            });
        }
        let balance = self.store.balance(actor.id).await?;
        info!("[shop] {} bought '{}' for {}", actor.id, item.name, item.cost);

        self.announce(Target::Shop, render::receipt(actor.id, item, balance))
            .await;
        if let Err(e) = self.post_shop_menu().await {
            warn!("[shop] Could not re-post menu: {}", e);
        }
        Ok(Reply::private(format!(
            "🎉 You bought **{}**! Remaining balance: **{} Us-Bucks**.",
            item.name, balance
        )))
    }
}
