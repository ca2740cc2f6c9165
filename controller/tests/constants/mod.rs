use common_structs::AccountId;

pub const START: u64 = 1_700_000_000;
pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Sequencer has been up since genesis; borrows open after one hour.
pub const GRACE_PERIOD: u64 = 3_600;
pub const PRICE_DECIMALS: usize = 8;
pub const ONE_DOLLAR: u64 = 100_000_000;

pub const TREASURY: AccountId = AccountId(0);
pub const SUPPLIER: AccountId = AccountId(1);
pub const BORROWER: AccountId = AccountId(2);
pub const LIQUIDATOR: AccountId = AccountId(3);
pub const OTHER_USER: AccountId = AccountId(4);

pub const USDC: &str = "USDC";
pub const DAI: &str = "DAI";
pub const EGLD: &str = "EGLD";
pub const XEGLD: &str = "XEGLD";
pub const ISOLATED: &str = "ISOLATED";
pub const SILOED: &str = "SILOED";
pub const CAPPED: &str = "CAPPED";

pub const EGLD_E_MODE: u8 = 1;
pub const EGLD_E_MODE_LTV: u64 = 9_000; // 90%
pub const EGLD_E_MODE_THRESHOLD: u64 = 9_250; // 92.5%
pub const EGLD_E_MODE_BONUS: u64 = 10_200; // 2%

/// Listing parameters of a test market. Percentages are BPS.
pub struct MarketFixture {
    pub ticker: &'static str,
    pub decimals: usize,
    pub price: u64,
    pub ltv: u64,
    pub liquidation_threshold: u64,
    pub liquidation_bonus: u64,
    pub protocol_fee: u64,
    pub reserve_factor: u64,
    /// Whole dollars, zero when not isolated.
    pub debt_ceiling: u64,
    pub stable_borrowing: bool,
    pub borrowable_in_isolation: bool,
    pub siloed_borrowing: bool,
    /// Whole tokens.
    pub supply_cap: Option<u64>,
    pub borrow_cap: Option<u64>,
    pub e_mode_category: u8,
}

pub const MARKETS: &[MarketFixture] = &[
    MarketFixture {
        ticker: USDC,
        decimals: 6,
        price: ONE_DOLLAR,
        ltv: 7_500,
        liquidation_threshold: 8_000,
        liquidation_bonus: 10_500,
        protocol_fee: 1_000,
        reserve_factor: 1_000,
        debt_ceiling: 0,
        stable_borrowing: true,
        borrowable_in_isolation: true,
        siloed_borrowing: false,
        supply_cap: None,
        borrow_cap: None,
        e_mode_category: 0,
    },
    MarketFixture {
        ticker: DAI,
        decimals: 18,
        price: ONE_DOLLAR,
        ltv: 8_000,
        liquidation_threshold: 8_250,
        liquidation_bonus: 10_500,
        protocol_fee: 1_000,
        reserve_factor: 1_000,
        debt_ceiling: 0,
        stable_borrowing: true,
        borrowable_in_isolation: false,
        siloed_borrowing: false,
        supply_cap: None,
        borrow_cap: None,
        e_mode_category: 0,
    },
    MarketFixture {
        ticker: EGLD,
        decimals: 18,
        price: 40 * ONE_DOLLAR,
        ltv: 7_500,
        liquidation_threshold: 8_000,
        liquidation_bonus: 10_750,
        protocol_fee: 1_000,
        reserve_factor: 2_000,
        debt_ceiling: 0,
        stable_borrowing: false,
        borrowable_in_isolation: false,
        siloed_borrowing: false,
        supply_cap: None,
        borrow_cap: None,
        e_mode_category: EGLD_E_MODE,
    },
    MarketFixture {
        ticker: XEGLD,
        decimals: 18,
        price: 50 * ONE_DOLLAR,
        ltv: 7_000,
        liquidation_threshold: 7_500,
        liquidation_bonus: 10_750,
        protocol_fee: 1_000,
        reserve_factor: 2_000,
        debt_ceiling: 0,
        stable_borrowing: false,
        borrowable_in_isolation: false,
        siloed_borrowing: false,
        supply_cap: None,
        borrow_cap: None,
        e_mode_category: EGLD_E_MODE,
    },
    MarketFixture {
        ticker: ISOLATED,
        decimals: 18,
        price: 5 * ONE_DOLLAR,
        ltv: 5_000,
        liquidation_threshold: 6_000,
        liquidation_bonus: 11_000,
        protocol_fee: 1_000,
        reserve_factor: 1_000,
        debt_ceiling: 1_000,
        stable_borrowing: false,
        borrowable_in_isolation: false,
        siloed_borrowing: false,
        supply_cap: None,
        borrow_cap: None,
        e_mode_category: 0,
    },
    MarketFixture {
        ticker: SILOED,
        decimals: 18,
        price: 4 * ONE_DOLLAR,
        ltv: 6_000,
        liquidation_threshold: 7_000,
        liquidation_bonus: 11_000,
        protocol_fee: 1_000,
        reserve_factor: 1_000,
        debt_ceiling: 0,
        stable_borrowing: false,
        borrowable_in_isolation: false,
        siloed_borrowing: true,
        supply_cap: None,
        borrow_cap: None,
        e_mode_category: 0,
    },
    MarketFixture {
        ticker: CAPPED,
        decimals: 8,
        price: 2 * ONE_DOLLAR,
        ltv: 6_000,
        liquidation_threshold: 7_000,
        liquidation_bonus: 11_000,
        protocol_fee: 1_000,
        reserve_factor: 1_000,
        debt_ceiling: 0,
        stable_borrowing: false,
        borrowable_in_isolation: false,
        siloed_borrowing: false,
        supply_cap: Some(100),
        borrow_cap: Some(50),
        e_mode_category: 0,
    },
];

pub fn market(ticker: &str) -> &'static MarketFixture {
    MARKETS
        .iter()
        .find(|market| market.ticker == ticker)
        .unwrap_or_else(|| panic!("unknown market {ticker}"))
}

// Two-slope curve shared by every market, RAY percentages in hundredths.
pub const OPTIMAL_USAGE_BPS: u64 = 8_000;
pub const OPTIMAL_STABLE_RATIO_BPS: u64 = 2_000;
pub const BASE_VARIABLE_RATE: u128 = 0;
pub const VARIABLE_SLOPE1: u128 = 400; // 4%
pub const VARIABLE_SLOPE2: u128 = 6_000; // 60%
pub const STABLE_SLOPE1: u128 = 200; // 2%
pub const STABLE_SLOPE2: u128 = 6_000; // 60%
pub const BASE_STABLE_OFFSET: u128 = 200; // 2%
pub const STABLE_EXCESS_OFFSET: u128 = 800; // 8%
