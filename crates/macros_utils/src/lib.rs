//! Small declarative helpers shared by the HTTP apps.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub mod __private {
    pub use actix_web::web::ServiceConfig;
}

/// Generate a `pub fn routes(cfg: &mut ServiceConfig)` registering handlers
/// and nested route modules, in order.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
///     module admin,
/// }
/// ```
///
/// `route` registers an actix handler generated by `#[get]`/`#[post]`/...;
/// `module` calls that module's own `routes` function.
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($($kind:ident $name:ident),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::__private::ServiceConfig) {
            $( $crate::__register_route!(cfg, $kind $name); )*
        }
    };
}

#[cfg(feature = "actix")]
#[doc(hidden)]
#[macro_export]
macro_rules! __register_route {
    ($cfg:ident, route $name:ident) => {
        $cfg.service($name);
    };
    ($cfg:ident, module $name:ident) => {
        $cfg.configure($name::routes);
    };
}
