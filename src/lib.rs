pub mod form;
pub mod i18n;
pub mod prelude;
pub mod renderer;

pub use form::{FormController, FormOptions};
pub use i18n::{I18nManager, Locale};
pub use renderer::RendererRegistry;
