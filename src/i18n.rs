// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use crate::domain::types::WizardStep;

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use mission_planner::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use mission_planner::i18n::t_with_args;
/// let msg = t_with_args("wizard.error.commit", &[("step", "2"), ("reason", "conflict")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// 步骤显示名称
pub fn step_label(step: WizardStep) -> String {
    let key = match step {
        WizardStep::JobDetails => "wizard.step.job_details",
        WizardStep::EntitySelection => "wizard.step.entity_selection",
        WizardStep::Inventories => "wizard.step.inventories",
        WizardStep::DemandsDeadlines => "wizard.step.demands_deadlines",
        WizardStep::Resources => "wizard.step.resources",
        WizardStep::Review => "wizard.step.review",
    };
    t(key)
}
