//! 通用工具函数

/// 可识别的DICOM文件扩展名
pub const DICOM_EXTENSION: &str = ".dcm";

/// 判断文件名或对象键是否为DICOM文件（区分大小写）
pub fn is_dicom_name(name: &str) -> bool {
    name.ends_with(DICOM_EXTENSION)
}

/// 判断候选检查日期是否严格晚于现有日期
///
/// 按字符串比较，仅在日期均为定长 `YYYYMMDD` 编码时等价于时间先后。
pub fn is_newer_study_date(candidate: &str, existing: &str) -> bool {
    candidate > existing
}
