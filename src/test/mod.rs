mod app_layer;
mod engine;
mod fault_channel;
mod support;
mod viz_meta;
