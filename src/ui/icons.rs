pub struct Icons;

impl Icons {
    pub const LINK: &str = "🔗";
    pub const BROKEN: &str = "⛓️‍💥";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const NEW: &str = "✨";
    pub const MOD: &str = "📝";
    pub const DEL: &str = "🗑️";
    pub const CLOCK: &str = "⏱️";
}
