mod admin;
mod health;
mod navigation;
mod sites;


macros_utils::routes! {
    module health,
    module navigation,
    module sites,
    module admin,
}
