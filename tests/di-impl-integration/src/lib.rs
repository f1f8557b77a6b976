//! 依赖注入容器的集中集成测试
//!
//! 测试位于 `tests/` 目录，从扫描范围到注册表覆盖完整的装配流程
