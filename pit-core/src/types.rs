use mimalloc::MiMalloc;
use serde::{Deserialize, Serialize};

/// Global allocator
/// Requires the `mimalloc` feature to be enabled in the `Cargo.toml` file.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// UserId identifies a player. Assigned externally by the login service.
pub type UserId = u32;

/// Price of one unit, in game dollars.
pub type Price = u32;

/// Volume is the number of units an order asks for.
pub type Volume = u32;

/// OrderId is unique across every asset book in the process.
pub type OrderId = u32;

/// Lowest price an order may carry.
pub const MIN_PRICE: Price = 1;
/// Highest price an order may carry.
pub const MAX_PRICE: Price = 200;
/// Lowest volume an order may carry.
pub const MIN_VOLUME: Volume = 1;
/// Highest volume an order may carry.
pub const MAX_VOLUME: Volume = 200;

/// Number of tradeable assets, one book each.
pub const NUM_ASSETS: usize = 4;

/// Unit value of each asset for portfolio valuation, indexed by `Asset`.
pub const UNIT_VALUES: [u64; NUM_ASSETS] = [5, 10, 15, 20];

/// Premium paid per complete ingredient set a player holds.
pub const SET_BONUS: u64 = 25;

/// Cash every player starts with when registered over the wire.
pub const STARTING_CASH: u32 = 1000;
/// Units of each asset every player starts with when registered over the wire.
pub const STARTING_ASSETS: u32 = 100;

/// Asset is one of the game's tradeable ingredients.
/// Each asset has its own book and its own unit value.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Asset {
    Bread = 0,
    Cheese = 1,
    Ham = 2,
    Pickle = 3,
}

impl Asset {
    /// All assets in index order.
    pub const ALL: [Asset; NUM_ASSETS] = [Asset::Bread, Asset::Cheese, Asset::Ham, Asset::Pickle];

    /// Position of this asset in index-ordered arrays.
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Asset for a raw index, if in range.
    pub fn from_index(index: usize) -> Option<Asset> {
        Asset::ALL.get(index).copied()
    }

    /// Lowercase name used in transport routes.
    pub fn route_name(self) -> &'static str {
        match self {
            Asset::Bread => "bread",
            Asset::Cheese => "cheese",
            Asset::Ham => "ham",
            Asset::Pickle => "pickle",
        }
    }

    /// Asset for a lowercase route name.
    pub fn from_route_name(name: &str) -> Option<Asset> {
        Asset::ALL.into_iter().find(|a| a.route_name() == name)
    }

    /// Unit value used for portfolio valuation.
    #[inline(always)]
    pub fn unit_value(self) -> u64 {
        UNIT_VALUES[self.index()]
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Bread => write!(f, "BREAD"),
            Asset::Cheese => write!(f, "CHEESE"),
            Asset::Ham => write!(f, "HAM"),
            Asset::Pickle => write!(f, "PICKLE"),
        }
    }
}

/// Side indicates the direction of an order.
#[derive(PartialEq, Eq, Default, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy means the user wants to acquire the asset, matching against sell orders.
    #[default]
    Buy,
    /// Sell means the user wants to sell the asset, matching against buy orders.
    Sell,
}

impl Side {
    /// The side an incoming order matches against.
    #[inline(always)]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order is a resting limit order, or the unmatched remainder of an
/// incoming one. `volume` is always the remaining (unfilled) volume.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Order {
    pub asset: Asset,
    pub side: Side,
    pub user_id: UserId,
    pub price: Price,
    pub volume: Volume,
    pub order_id: OrderId,
}

impl Order {
    /// Cash backing a resting buy: price times remaining volume.
    #[inline(always)]
    pub fn cost(&self) -> u32 {
        self.price * self.volume
    }
}

/// Trade records one fill between a resting maker and an incoming taker.
/// `price` is always the maker's price, `maker_order_id` the resting order.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Trade {
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub price: Price,
    pub volume: Volume,
    pub maker_order_id: OrderId,
}

/// OrderResult is what placing an order produces: the fills it caused,
/// and the resting remainder if any volume was left over.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OrderResult {
    pub trades: Vec<Trade>,
    pub unmatched: Option<Order>,
}

/// Per-user cash record, global across all books.
///
/// `buying_power` is `held` minus the cash backing the user's resting
/// buy orders on every book.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Serialize)]
pub struct CashBalance {
    pub held: u32,
    pub buying_power: u32,
}

impl CashBalance {
    /// A fresh record with nothing reserved.
    pub fn new(initial: u32) -> Self {
        Self {
            held: initial,
            buying_power: initial,
        }
    }
}

/// Per-user asset record, local to one book.
///
/// `selling_power` is `held` minus the volume of the user's resting
/// sell orders on this book.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Serialize)]
pub struct AssetBalance {
    pub held: u32,
    pub selling_power: u32,
}

impl AssetBalance {
    /// A fresh record with nothing reserved.
    pub fn new(initial: u32) -> Self {
        Self {
            held: initial,
            selling_power: initial,
        }
    }
}
