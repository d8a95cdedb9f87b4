mod settings;

pub use settings::{
    AppSettings, DatabaseSettings, InvitationSettings, JwtSettings, Settings,
};
