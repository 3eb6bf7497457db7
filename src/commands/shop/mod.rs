pub mod adjust_stock_command;
pub mod create_category_command;
pub mod create_shop_item_command;

pub use adjust_stock_command::AdjustStockCommand;
pub use create_category_command::CreateCategoryCommand;
pub use create_shop_item_command::CreateShopItemCommand;
