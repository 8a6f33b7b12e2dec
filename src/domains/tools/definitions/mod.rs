//! Tool definitions module.
//!
//! - `proxy`: the generic REST proxy every backend tool is built from
//! - `systems`: system list, architecture and product-info lookups
//! - `weather`: a self-contained example tool

pub mod proxy;
pub mod systems;
pub mod weather;

pub use proxy::{PayloadShape, ProxyParams, RestEndpoint, RestProxyTool};
pub use systems::{
    ListSystemsTool, NoParams, SystemArchitectureTool, SystemNameParams, SystemProductInfoTool,
    list_systems_tool, system_architecture_tool, system_product_info_tool,
};
pub use weather::{WeatherParams, WeatherTool};
