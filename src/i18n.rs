use crate::filter::FilterLabels;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Display languages offered by the language selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Locale {
    #[default]
    Persian,
    English,
}

/// Every string the dashboard shows, for one language.
#[derive(Debug, Serialize)]
pub struct Texts {
    pub title: &'static str,
    pub upload: &'static str,
    pub filters: &'static str,
    pub risk_level: &'static str,
    pub risk_type: &'static str,
    pub summary: &'static str,
    pub total: &'static str,
    pub high: &'static str,
    pub percent_high: &'static str,
    pub table_tab: &'static str,
    pub charts_tab: &'static str,
    pub export_tab: &'static str,
    pub pie_chart: &'static str,
    pub bar_chart: &'static str,
    pub download_excel: &'static str,
    pub download_pdf: &'static str,
    pub save_to_db: &'static str,
    pub no_file: &'static str,
    pub load_failed: &'static str,
    pub report_title: &'static str,
    pub report_date: &'static str,
    pub saved_to_db: &'static str,
    pub persist_failed: &'static str,
    pub search: &'static str,
    pub apply: &'static str,
    pub admin_dashboard: &'static str,
    pub select_table: &'static str,
    pub login_title: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    pub login: &'static str,
    pub logout: &'static str,
    pub login_failed: &'static str,
    pub language: &'static str,
    /// Literal a "high" risk level cell holds in this language.
    pub high_value: &'static str,
}

pub static PERSIAN: Texts = Texts {
    title: "📊 داشبورد تحلیل ریسک‌های فناوری اطلاعات",
    upload: "⬆️ فایل اکسل را بارگذاری کنید",
    filters: "🎛 فیلترها",
    risk_level: "سطح ریسک",
    risk_type: "نوع ریسک",
    summary: "📌 خلاصه آماری",
    total: "تعداد کل ریسک‌ها",
    high: "ریسک‌های زیاد",
    percent_high: "درصد ریسک زیاد",
    table_tab: "📋 جدول داده‌ها",
    charts_tab: "📊 نمودارها",
    export_tab: "📤 خروجی",
    pie_chart: "نمودار دایره‌ای سطح ریسک",
    bar_chart: "نمودار ستونی نوع ریسک",
    download_excel: "📥 دریافت فایل Excel",
    download_pdf: "📄 دریافت فایل PDF",
    save_to_db: "💾 ذخیره در پایگاه داده",
    no_file: "👆 لطفاً یک فایل اکسل بارگذاری کنید.",
    load_failed: "❌ فایل قابل خواندن نیست. لطفاً فایل دیگری بارگذاری کنید.",
    report_title: "گزارش تحلیل ریسک",
    report_date: "تاریخ گزارش",
    saved_to_db: "✅ داده‌ها ذخیره شدند.",
    persist_failed: "❌ ذخیره در پایگاه داده ناموفق بود.",
    search: "🔎 جستجو در جدول",
    apply: "اعمال",
    admin_dashboard: "📂 داشبورد مدیریتی",
    select_table: "انتخاب جدول از پایگاه داده",
    login_title: "🔐 ورود به سیستم",
    username: "نام کاربری",
    password: "رمز عبور",
    login: "ورود",
    logout: "خروج",
    login_failed: "❌ اطلاعات ورود نادرست است.",
    language: "🌐 زبان",
    high_value: "زیاد",
};

pub static ENGLISH: Texts = Texts {
    title: "📊 IT Risk Analysis Dashboard",
    upload: "⬆️ Upload Excel file",
    filters: "🎛 Filters",
    risk_level: "Risk Level",
    risk_type: "Risk Type",
    summary: "📌 Summary",
    total: "Total Risks",
    high: "High Risk",
    percent_high: "High Risk %",
    table_tab: "📋 Data Table",
    charts_tab: "📊 Charts",
    export_tab: "📤 Export",
    pie_chart: "Risk Level Pie Chart",
    bar_chart: "Risk Type Bar Chart",
    download_excel: "📥 Download Excel",
    download_pdf: "📄 Download PDF",
    save_to_db: "💾 Save to database",
    no_file: "👆 Please upload an Excel file.",
    load_failed: "❌ The file could not be read. Please upload another file.",
    report_title: "IT Risk Analysis Report",
    report_date: "Report Date",
    saved_to_db: "✅ Data saved.",
    persist_failed: "❌ Saving to the database failed.",
    search: "🔎 Search in table",
    apply: "Apply",
    admin_dashboard: "📂 Admin Dashboard",
    select_table: "Select table from database",
    login_title: "🔐 Sign in",
    username: "Username",
    password: "Password",
    login: "Sign in",
    logout: "Sign out",
    login_failed: "❌ Invalid login details.",
    language: "🌐 Language",
    high_value: "High",
};

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Persian, Locale::English];

    pub fn texts(self) -> &'static Texts {
        match self {
            Locale::Persian => &PERSIAN,
            Locale::English => &ENGLISH,
        }
    }

    /// Short code used in forms and query strings.
    pub fn code(self) -> &'static str {
        match self {
            Locale::Persian => "fa",
            Locale::English => "en",
        }
    }

    /// Name shown in the language selector.
    pub fn native_name(self) -> &'static str {
        match self {
            Locale::Persian => "فارسی",
            Locale::English => "English",
        }
    }

    /// Text direction for the page.
    pub fn dir(self) -> &'static str {
        match self {
            Locale::Persian => "rtl",
            Locale::English => "ltr",
        }
    }
}

impl Texts {
    /// Column headers the filters and charts key on in this language.
    pub fn filter_labels(&self) -> FilterLabels<'static> {
        FilterLabels {
            risk_level: self.risk_level,
            risk_type: self.risk_type,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fa" | "persian" | "فارسی" => Ok(Locale::Persian),
            "en" | "english" => Ok(Locale::English),
            other => Err(format!("unknown locale: {}", other)),
        }
    }
}
